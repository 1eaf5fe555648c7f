use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Every engine fault gets its own variant so callers can see which layer
/// failed; none of them are retried internally. A stored value that fails to
/// *decode* is not an error at this level: it is recovered locally by the
/// posting-list codec and only logged.
#[derive(Error, Debug)]
pub enum ModelError {
	#[error("database error: {0}")]
	Database(#[from] redb::DatabaseError),

	#[error("transaction error: {0}")]
	Transaction(#[from] redb::TransactionError),

	#[error("table error: {0}")]
	Table(#[from] redb::TableError),

	#[error("commit error: {0}")]
	Commit(#[from] redb::CommitError),

	#[error("storage error: {0}")]
	Storage(#[from] redb::StorageError),

	#[error("serialization error: {0}")]
	Serialization(#[from] postcard::Error),

	/// Generation was requested before any sentence was learned.
	#[error("the model contains no start pairs")]
	EmptyModel,
}

pub type Result<T> = std::result::Result<T, ModelError>;
