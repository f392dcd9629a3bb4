use std::fmt::Write;

use chainaudit_core::{AppError, AppResult};
use chrono::Utc;

/// Generates `audit_<unix-millis>_<16 hex chars>`.
pub fn generate_audit_id() -> AppResult<String> {
    let mut bytes = [0_u8; 8];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate audit id: {error}")))?;

    let suffix = bytes
        .iter()
        .fold(String::with_capacity(16), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        });

    Ok(format!("audit_{}_{suffix}", Utc::now().timestamp_millis()))
}
