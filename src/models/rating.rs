use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 5;
pub const MAX_COMMENT_CHARS: usize = 500;

/// Who gave the rating: the rider (`user`) or the driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaterType {
    User,
    Driver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub rating_id: Uuid,
    pub ride_id: Uuid,
    pub rater_id: Uuid,
    pub rater_type: RaterType,
    pub rated_user_id: Uuid,
    pub score: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingSummary {
    pub user_id: Uuid,
    pub total_ratings: usize,
    pub average_rating: f64,
    pub breakdown: BTreeMap<u8, usize>,
}

impl RatingSummary {
    pub fn from_ratings(user_id: Uuid, ratings: &[Rating]) -> Self {
        let scores = (MIN_SCORE as u8)..=(MAX_SCORE as u8);
        let mut breakdown: BTreeMap<u8, usize> = scores.map(|score| (score, 0)).collect();

        for rating in ratings {
            *breakdown.entry(rating.score).or_insert(0) += 1;
        }

        let total_ratings = ratings.len();
        let average_rating = if total_ratings == 0 {
            0.0
        } else {
            let sum: u64 = ratings.iter().map(|r| u64::from(r.score)).sum();
            let mean = sum as f64 / total_ratings as f64;
            (mean * 100.0).round() / 100.0
        };

        Self {
            user_id,
            total_ratings,
            average_rating,
            breakdown,
        }
    }
}
