use metrics::counter;
use thiserror::Error;
use tracing::{error, info, warn};

use comissoes_core::{parse_record_id, Commission, DashboardSummary, SaleRequest, ValidationError};
use comissoes_storage::{CommissionRepoError, Database};

/// Validates sales, derives commissions and relays every read and write to storage.
///
/// No records are cached here; each call goes through a pooled connection.
#[derive(Clone)]
pub struct CommissionService {
    database: Database,
}

impl CommissionService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    #[cfg(test)]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Registers a sale and returns the stored record.
    pub async fn add(&self, request: SaleRequest) -> Result<Commission, ServiceError> {
        let draft = request.validate().inspect_err(|err| {
            warn!(stage = "service", operation = "add", error = %err, "sale rejected");
        })?;

        let record = self
            .database
            .commissions()
            .insert(draft)
            .await
            .map_err(|err| storage_failure("add", err))?;

        info!(
            stage = "service",
            id = record.id,
            salesperson = %record.salesperson,
            product = %record.product,
            sale_value = record.sale_value,
            commission_value = record.commission_value,
            "sale registered"
        );
        Ok(record)
    }

    pub async fn list(&self) -> Result<Vec<Commission>, ServiceError> {
        self.database
            .commissions()
            .list_all()
            .await
            .map_err(|err| storage_failure("list", err))
    }

    /// Deletes a record by its raw client-supplied id, returning the parsed id.
    pub async fn remove(&self, id_raw: Option<&str>) -> Result<i64, ServiceError> {
        let id = parse_record_id(id_raw)?;

        let removed = self
            .database
            .commissions()
            .delete_by_id(id)
            .await
            .map_err(|err| storage_failure("remove", err))?;

        if !removed {
            info!(stage = "service", id, "delete requested for unknown record");
            return Err(ServiceError::NotFound(id));
        }

        info!(stage = "service", id, "record removed");
        Ok(id)
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        self.database
            .commissions()
            .totals()
            .await
            .map_err(|err| storage_failure("dashboard", err))
    }
}

fn storage_failure(operation: &'static str, err: CommissionRepoError) -> ServiceError {
    error!(stage = "service", operation, error = %err, "storage operation failed");
    counter!("comissao_storage_errors_total", "operation" => operation).increment(1);
    ServiceError::Persistence(err)
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("commission {0} not found")]
    NotFound(i64),
    #[error("persistence failure: {0}")]
    Persistence(CommissionRepoError),
}
