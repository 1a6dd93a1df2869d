use std::sync::Arc;
use tracing::info;

use crate::errors::AppError;
use crate::external::ethereum::XpubDeriver;
use crate::models::XpubData;
use crate::services::job_runner::JobResult;

pub async fn check_for_new_xpub_addresses(
    deriver: Arc<dyn XpubDeriver>,
    xpubs: Vec<XpubData>,
) -> Result<JobResult, AppError> {
    let added = deriver.check_for_new_xpub_addresses(&xpubs).await?;
    info!("Xpub derivation over {} xpubs added {} addresses", xpubs.len(), added);

    Ok(JobResult {
        items_processed: xpubs.len() as i32,
        items_failed: 0,
    })
}
