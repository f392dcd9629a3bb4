use super::*;

pub(super) async fn check_ledger(state: &AppState) -> HealthDependencyStatus {
    let Some(recorder) = state.audit_recorder.as_ref() else {
        return HealthDependencyStatus {
            status: "disabled",
            detail: None,
        };
    };

    match recorder.halted_reason().await {
        Ok(Some(reason)) => {
            return HealthDependencyStatus {
                status: "halted",
                detail: Some(reason),
            };
        }
        Ok(None) => {}
        Err(error) => {
            return HealthDependencyStatus {
                status: "error",
                detail: Some(format!("ledger halt check failed: {error}")),
            };
        }
    }

    match state.ledger_pool.clone() {
        Some(pool) => check_postgres(pool).await,
        None => HealthDependencyStatus {
            status: "ok",
            detail: Some("in-memory ledger".to_owned()),
        },
    }
}

async fn check_postgres(pool: sqlx::PgPool) -> HealthDependencyStatus {
    let check = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&pool)
        .await;

    match check {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
    }
}
