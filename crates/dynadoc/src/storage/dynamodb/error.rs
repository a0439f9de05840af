//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `DocumentError`. Only a conditional check failure
//! inside a cancelled transaction is interpreted; everything else is kept
//! unchanged as the source of `DocumentError::Backend`.

use std::fmt::Debug;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::CancellationReason;
use dynadoc_core::DocumentError;

use super::attributes::AttributeMapper;
use super::conversions::Item;

/// Cancellation reason code reported for a failed condition expression.
pub const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Index of the first transaction item whose condition failed.
pub fn first_conditional_failure(reasons: &[CancellationReason]) -> Option<usize> {
    reasons
        .iter()
        .position(|reason| reason.code() == Some(CONDITIONAL_CHECK_FAILED))
}

/// Map a TransactWriteItems SDK error to DocumentError.
///
/// `keys` holds the key attributes of every transaction item, in request
/// order.
pub fn map_transact_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactWriteItemsError, R>,
    keys: &[Item],
    mapper: &AttributeMapper,
) -> DocumentError {
    let failed = match err.as_service_error() {
        Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) => {
            first_conditional_failure(cancelled.cancellation_reasons())
        }
        _ => None,
    };

    let conflict = failed
        .and_then(|index| keys.get(index))
        .and_then(|key| mapper.from_key_attributes(key).ok());

    match conflict {
        Some(id) => {
            tracing::debug!(id = %id, "Transaction cancelled by a version conflict");
            DocumentError::Conflict(id)
        }
        None => DocumentError::backend(err),
    }
}

/// Map any other SDK error to DocumentError.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>) -> DocumentError
where
    E: std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    DocumentError::backend(err)
}
