use crate::Result;
use core::fmt::Write;
use ohno::IntoAppError;
use serde::Serialize;

/// Pretty-printed JSON of any report payload
pub fn generate<T: Serialize + ?Sized, W: Write>(payload: &T, writer: &mut W) -> Result<()> {
    let text = serde_json::to_string_pretty(payload).into_app_err("unable to serialize report")?;
    writeln!(writer, "{text}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::summary::{CardStatus, SummaryAggregate, SummaryCard};
    use chrono::Utc;

    #[test]
    fn test_aggregate_uses_wire_field_names() {
        let mut aggregate = SummaryAggregate::new();
        let _ = aggregate.insert(
            "TODO Items".to_string(),
            SummaryCard {
                title: "TODO Items".to_string(),
                icon: "list-todo".to_string(),
                status: CardStatus::Success,
                display_value: "0 items".to_string(),
                last_updated: Utc::now(),
                detail_url: "/healthdeck/productivity/todos".to_string(),
                badges: Vec::new(),
            },
        );

        let mut output = String::new();
        generate(&aggregate, &mut output).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["TODO Items"]["status"], "success");
        assert_eq!(value["TODO Items"]["value"], "0 items");
        assert_eq!(value["TODO Items"]["url"], "/healthdeck/productivity/todos");
    }
}
