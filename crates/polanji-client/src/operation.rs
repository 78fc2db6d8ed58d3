//! Logical operation names used to tag requests for metric attribution.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every API call the clients know how to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "createUser")]
    CreateUser,
    #[serde(rename = "userLogin")]
    UserLogin,
    #[serde(rename = "userInterests")]
    UserInterests,
    #[serde(rename = "getCompletedCourses")]
    GetCompletedCourses,
    #[serde(rename = "listAllCourses")]
    ListAllCourses,
    #[serde(rename = "getRecommendations")]
    GetRecommendations,
    #[serde(rename = "getEnrolledCourses")]
    GetEnrolledCourses,
    #[serde(rename = "enrollCourse")]
    EnrollCourse,
    #[serde(rename = "getCourseDetails")]
    GetCourseDetails,
    #[serde(rename = "updateProgress")]
    UpdateProgress,
    #[serde(rename = "startQuiz")]
    StartQuiz,
    #[serde(rename = "completeQuiz")]
    CompleteQuiz,
    #[serde(rename = "getAllTopics")]
    GetAllTopics,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::CreateUser,
        Operation::UserLogin,
        Operation::UserInterests,
        Operation::GetCompletedCourses,
        Operation::ListAllCourses,
        Operation::GetRecommendations,
        Operation::GetEnrolledCourses,
        Operation::EnrollCourse,
        Operation::GetCourseDetails,
        Operation::UpdateProgress,
        Operation::StartQuiz,
        Operation::CompleteQuiz,
        Operation::GetAllTopics,
    ];

    /// Tag value used as the `name` of this operation's metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateUser => "createUser",
            Operation::UserLogin => "userLogin",
            Operation::UserInterests => "userInterests",
            Operation::GetCompletedCourses => "getCompletedCourses",
            Operation::ListAllCourses => "listAllCourses",
            Operation::GetRecommendations => "getRecommendations",
            Operation::GetEnrolledCourses => "getEnrolledCourses",
            Operation::EnrollCourse => "enrollCourse",
            Operation::GetCourseDetails => "getCourseDetails",
            Operation::UpdateProgress => "updateProgress",
            Operation::StartQuiz => "startQuiz",
            Operation::CompleteQuiz => "completeQuiz",
            Operation::GetAllTopics => "getAllTopics",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ClientError::UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let err = "deleteUser".parse::<Operation>().unwrap_err();
        assert!(matches!(err, ClientError::UnknownOperation(name) if name == "deleteUser"));
    }

    #[test]
    fn test_serde_uses_tag_names() {
        let json = serde_json::to_string(&Operation::UserLogin).unwrap();
        assert_eq!(json, "\"userLogin\"");
    }
}
