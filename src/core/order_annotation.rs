use crate::core::admin_client::AdminClient;
use crate::core::error::IntakeError;
use crate::core::operations::{
    OrderInput, OrderLookup, OrderLookupVariables, OrderNode, OrderUpdate, OrderUpdateVariables,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::str::FromStr;

/// What happens to a note already present on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteMode {
    #[default]
    Append,
    Overwrite,
}

impl FromStr for NoteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(NoteMode::Append),
            "overwrite" => Ok(NoteMode::Overwrite),
            other => Err(format!("expected `append` or `overwrite`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedOrder {
    pub order_id: String,
}

pub fn order_search_query(order_number: &str) -> String {
    format!("name:#{}", order_number)
}

pub fn merge_note(existing: Option<&str>, entry: &str, mode: NoteMode, at: DateTime<Utc>) -> String {
    match (mode, existing.map(str::trim).filter(|n| !n.is_empty())) {
        (NoteMode::Append, Some(previous)) => format!(
            "{}\n\n--- {} ---\n{}",
            previous,
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry
        ),
        _ => entry.to_string(),
    }
}

pub struct OrderAnnotator<'a> {
    admin: &'a AdminClient,
    note_mode: NoteMode,
}

impl<'a> OrderAnnotator<'a> {
    pub fn new(admin: &'a AdminClient, note_mode: NoteMode) -> Self {
        Self { admin, note_mode }
    }

    /// Replaces the order's tags with `tag` and records `note_text` on it.
    pub async fn annotate(
        &self,
        order_number: &str,
        tag: &str,
        note_text: &str,
    ) -> Result<AnnotatedOrder, IntakeError> {
        let order = self.find_order(order_number).await?;
        tracing::info!(order_number, order_id = %order.id, "order resolved");

        let note = merge_note(order.note.as_deref(), note_text, self.note_mode, Utc::now());
        let variables = OrderUpdateVariables {
            input: OrderInput {
                id: order.id.clone(),
                tags: vec![tag.to_string()],
                note,
            },
        };
        let payload = self
            .admin
            .execute::<OrderUpdate>(&variables)
            .await?
            .order_update
            .ok_or_else(|| IntakeError::remote_validation("orderUpdate", "empty payload"))?;

        if let Some(err) = payload.user_errors.first() {
            tracing::error!(order_id = %order.id, field = %err.field_path(), "order update rejected: {}", err.message);
            return Err(IntakeError::remote_validation(err.field_path(), &err.message));
        }

        let updated = payload
            .order
            .ok_or_else(|| IntakeError::remote_validation("order", "no order returned"))?;
        tracing::info!(order_id = %updated.id, tags = ?updated.tags, "order annotated");

        Ok(AnnotatedOrder {
            order_id: updated.id,
        })
    }

    /// First match wins; the search is limited to one result.
    pub async fn find_order(&self, order_number: &str) -> Result<OrderNode, IntakeError> {
        let data = self
            .admin
            .execute::<OrderLookup>(&OrderLookupVariables {
                query: order_search_query(order_number),
            })
            .await?;

        data.orders
            .edges
            .into_iter()
            .next()
            .map(|edge| edge.node)
            .ok_or_else(|| IntakeError::OrderNotFound {
                order_number: order_number.to_string(),
            })
    }
}
