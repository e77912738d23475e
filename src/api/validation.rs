use super::ApiError;
use crate::domain::{OrderId, SeriesId};

pub fn validate_series_id(id: i32) -> Result<SeriesId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "מזהה סדרה לא תקין: {id}"
        )));
    }
    Ok(SeriesId::new(id))
}

pub fn validate_episode_number(episode: i32) -> Result<i32, ApiError> {
    if episode <= 0 {
        return Err(ApiError::validation(format!(
            "מספר פרק לא תקין: {episode}"
        )));
    }
    Ok(episode)
}

pub fn validate_order_id(raw: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(raw.trim()).ok_or_else(|| ApiError::validation("מספר הזמנה לא תקין"))
}
