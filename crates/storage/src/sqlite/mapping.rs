use exam_core::model::{
    AnswerRecord, Attempt, AttemptParts, Category, Entitlement, QuestionId, TestId, UserId,
};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn i64_to_usize(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    u64_to_i64("user_id", id.value())
}

pub(crate) fn test_id_to_i64(id: TestId) -> Result<i64, StorageError> {
    u64_to_i64("test_id", id.value())
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    u64_to_i64("question_id", id.value())
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(ser)
}

pub(crate) fn from_json<T: DeserializeOwned>(
    field: &'static str,
    raw: &str,
) -> Result<T, StorageError> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("invalid {field}: {e}")))
}

pub(crate) fn bool_from_i64(field: &'static str, v: i64) -> Result<bool, StorageError> {
    match v {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(StorageError::Serialization(format!("invalid {field}: {v}"))),
    }
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<Attempt, StorageError> {
    let user_id = UserId::new(i64_to_u64(
        "user_id",
        row.try_get::<i64, _>("user_id").map_err(ser)?,
    )?);
    let test_id = TestId::new(i64_to_u64(
        "test_id",
        row.try_get::<i64, _>("test_id").map_err(ser)?,
    )?);
    let category = Category::new(row.try_get::<String, _>("category").map_err(ser)?).map_err(ser)?;

    let presentation_order: Vec<usize> = from_json(
        "presentation_order",
        &row.try_get::<String, _>("presentation_order").map_err(ser)?,
    )?;
    let option_order: Vec<Vec<usize>> = from_json(
        "option_order",
        &row.try_get::<String, _>("option_order").map_err(ser)?,
    )?;
    let answers: Vec<AnswerRecord> =
        from_json("answers", &row.try_get::<String, _>("answers").map_err(ser)?)?;

    Attempt::from_parts(AttemptParts {
        user_id,
        test_id,
        category,
        selected_length: i64_to_usize(
            "selected_length",
            row.try_get::<i64, _>("selected_length").map_err(ser)?,
        )?,
        presentation_order,
        option_order,
        answers,
        current_position: i64_to_usize(
            "current_position",
            row.try_get::<i64, _>("current_position").map_err(ser)?,
        )?,
        finished: bool_from_i64("finished", row.try_get::<i64, _>("finished").map_err(ser)?)?,
        exam_mode: bool_from_i64("exam_mode", row.try_get::<i64, _>("exam_mode").map_err(ser)?)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
    .map_err(ser)
}

pub(crate) fn map_entitlement_row(row: &SqliteRow) -> Result<Entitlement, StorageError> {
    let subscribed = bool_from_i64(
        "subscribed",
        row.try_get::<i64, _>("subscribed").map_err(ser)?,
    )?;
    let remaining = i64_to_u32(
        "remaining_free_questions",
        row.try_get::<i64, _>("remaining_free_questions")
            .map_err(ser)?,
    )?;
    Ok(Entitlement::from_persisted(subscribed, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_columns_reject_out_of_range_values() {
        assert!(!bool_from_i64("finished", 0).unwrap());
        assert!(bool_from_i64("finished", 1).unwrap());
        assert!(matches!(
            bool_from_i64("finished", 2),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(question_id_from_i64(-1).is_err());
        assert_eq!(question_id_from_i64(7).unwrap(), QuestionId::new(7));
    }

    #[test]
    fn answers_json_uses_plain_ids() {
        let record = AnswerRecord {
            question_id: QuestionId::new(3),
            chosen_option_index: None,
            correct_option_index: 1,
        };
        let raw = to_json(&vec![record]).unwrap();
        assert_eq!(
            raw,
            r#"[{"question_id":3,"chosen_option_index":null,"correct_option_index":1}]"#
        );
        let back: Vec<AnswerRecord> = from_json("answers", &raw).unwrap();
        assert_eq!(back, vec![record]);
    }
}
