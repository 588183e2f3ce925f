use sqlx::FromRow;

/// Coarse permission value attached to a user; interpretation (level, bitmask)
/// is left to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct Permission {
    pub user_id: i64,
    #[sqlx(rename = "permission")]
    pub value: i32,
}
