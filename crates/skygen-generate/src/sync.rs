use tracing::{debug, info};

use skygen_client::{Table, TableService};
use skygen_core::Schema;

use crate::errors::SchemaSyncError;
use crate::model::SyncReport;

/// Bring the remote table's properties in line with `schema`.
///
/// Only adds properties. Every conflict is detected before the first
/// create request, so a conflicting schema leaves the table untouched.
pub async fn sync_schema(
    service: &dyn TableService,
    table: &Table,
    schema: Option<&Schema>,
) -> Result<SyncReport, SchemaSyncError> {
    let Some(schema) = schema else {
        debug!(table = %table.name, "no schema declared; skipping sync");
        return Ok(SyncReport {
            skipped: true,
            ..SyncReport::default()
        });
    };

    let remote = service
        .properties(table)
        .await
        .map_err(SchemaSyncError::Fetch)?;

    let mut report = SyncReport::default();
    let mut missing = Vec::new();
    for declared in &schema.properties {
        match remote.iter().find(|property| property.name == declared.name) {
            Some(existing) => {
                if existing.data_type != declared.data_type
                    || existing.transient != declared.transient
                {
                    return Err(SchemaSyncError::Conflict {
                        property: declared.name.clone(),
                        declared: declared.data_type,
                        declared_transient: declared.transient,
                        remote: existing.data_type,
                        remote_transient: existing.transient,
                    });
                }
                report.existing.push(declared.name.clone());
            }
            None => missing.push(declared),
        }
    }

    for property in missing {
        service
            .create_property(table, property)
            .await
            .map_err(|source| SchemaSyncError::Remote {
                property: property.name.clone(),
                source,
            })?;
        debug!(table = %table.name, property = %property.name, "property added");
        report.added.push(property.name.clone());
    }

    info!(
        event = "schema_synced",
        table = %table.name,
        added = report.added.len(),
        existing = report.existing.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use skygen_client::{InMemoryTableService, Request};
    use skygen_core::{DataType, PropertyDefinition};

    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            PropertyDefinition::new("action", DataType::Factor),
            PropertyDefinition::new("amount", DataType::Float).transient(),
        ])
    }

    fn creates(service: &InMemoryTableService) -> usize {
        service
            .requests()
            .iter()
            .filter(|request| matches!(request, Request::CreateProperty { .. }))
            .count()
    }

    #[tokio::test]
    async fn adds_missing_properties_once() {
        let service = InMemoryTableService::new().with_table(
            "events",
            vec![PropertyDefinition::new("action", DataType::Factor)],
        );
        let table = Table::new("events");

        let first = sync_schema(&service, &table, Some(&schema())).await.unwrap();
        assert_eq!(first.added, vec!["amount".to_string()]);
        assert_eq!(first.existing, vec!["action".to_string()]);

        let second = sync_schema(&service, &table, Some(&schema())).await.unwrap();
        assert!(second.added.is_empty());
        assert_eq!(creates(&service), 1);
        assert_eq!(service.table_properties("events").len(), 2);
    }

    #[tokio::test]
    async fn conflict_is_reported_before_any_create() {
        let service = InMemoryTableService::new().with_table(
            "events",
            vec![PropertyDefinition::new("amount", DataType::Integer)],
        );
        let err = sync_schema(&service, &Table::new("events"), Some(&schema()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SchemaSyncError::Conflict { ref property, .. } if property == "amount"
        ));
        assert_eq!(creates(&service), 0);
    }

    #[tokio::test]
    async fn missing_schema_skips_remote_calls() {
        let service = InMemoryTableService::new().with_table("events", Vec::new());
        let report = sync_schema(&service, &Table::new("events"), None)
            .await
            .unwrap();
        assert!(report.skipped);
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_fails_fetch() {
        let service = InMemoryTableService::new().with_table("events", Vec::new());
        service.set_reachable(false);
        let err = sync_schema(&service, &Table::new("events"), Some(&schema()))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaSyncError::Fetch(_)));
    }
}
