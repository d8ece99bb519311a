use axum::Json;
use chrono::{Datelike, Utc, Weekday};

use crate::models::account::{CurrentDateResponse, HealthResponse};
use crate::models::response::ApiResponse;

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Ministry of Banking API is running".to_string(),
        timestamp: Utc::now(),
    })
}

/// POST /api/common/get-current-date
pub async fn get_current_date() -> ApiResponse<CurrentDateResponse> {
    let now = Utc::now();
    let date = now.format("%Y-%m-%d").to_string();
    let day = weekday_name(now.weekday());

    ApiResponse::ok(CurrentDateResponse {
        message: format!("Today is {}, {}", day, date),
        date,
        day: day.to_string(),
        timestamp: now,
    })
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
