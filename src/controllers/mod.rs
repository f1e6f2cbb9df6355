use crate::errors::problem::Problem;

pub mod auth_controller;
pub mod catalog_controller;
pub mod debug_controller;
pub mod group_controller;
pub mod notification_controller;
pub mod profile_controller;
pub mod room_controller;
pub mod user_controller;

pub(crate) fn parse_id(value: &str, field: &str) -> Result<i64, Problem> {
        value.trim().parse::<i64>().map_err(|_| Problem::BadRequest(format!("Invalid {field}")))
}

pub(crate) fn parse_ids(values: &[String], field: &str) -> Result<Vec<i64>, Problem> {
        values.iter().map(|value| parse_id(value, field)).collect()
}

pub(crate) fn parse_optional_id(value: Option<&str>, field: &str) -> Result<Option<i64>, Problem> {
        value.filter(|v| !v.trim().is_empty()).map(|v| parse_id(v, field)).transpose()
}

/// Trims a required text field and rejects it when blank.
pub(crate) fn required_text(value: Option<&str>, message: &str) -> Result<String, Problem> {
        value.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Problem::BadRequest(message.to_string()))
}

/// Trims an optional text field; blank becomes `None`.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
        value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
        use super::*;

        #[test]
        fn parses_ids_from_strings() {
                assert_eq!(parse_id(" 7318 ", "room id").unwrap(), 7318);
                assert_eq!(parse_ids(&["1".to_string(), "2".to_string()], "id").unwrap(), vec![1, 2]);
                assert_eq!(parse_optional_id(Some(""), "id").unwrap(), None);
        }

        #[test]
        fn bad_id_names_the_field() {
                let err = parse_id("abc", "room id").unwrap_err();

                assert_eq!(err, Problem::BadRequest("Invalid room id".to_string()));
        }

        #[test]
        fn blank_required_text_is_rejected() {
                assert!(required_text(Some("   "), "Name is required").is_err());
                assert_eq!(required_text(Some(" Ada "), "Name is required").unwrap(), "Ada");
                assert_eq!(optional_text(Some("  ")), None);
        }
}
