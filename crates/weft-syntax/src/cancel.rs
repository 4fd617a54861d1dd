use salsa::Database;

/// Number of loop iterations between two cancellation checks.
pub const CHECK_INTERVAL: usize = 256;

/// Unwinds with salsa's cancellation payload when the current revision was cancelled.
///
/// Only every [`CHECK_INTERVAL`]-th `step` actually polls the database.
#[inline]
pub fn check_canceled(db: &dyn Database, step: usize) {
    if step % CHECK_INTERVAL == 0 {
        db.unwind_if_revision_cancelled();
    }
}
