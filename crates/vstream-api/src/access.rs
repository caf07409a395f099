//! Owner-or-admin access rules.
//!
//! Pure checks over a [`Caller`]; the HTTP edge turns `false` into
//! `ApiError::Forbidden`.

use vstream_models::{Caller, Role, VideoRecord};

/// Whether the caller may view or stream the record.
pub fn can_read(caller: &Caller, record: &VideoRecord) -> bool {
    caller.id == record.owner_id || caller.is_admin
}

/// Whether the caller may upload new videos.
pub fn can_write(caller: &Caller) -> bool {
    matches!(caller.role, Role::Editor | Role::Admin) || caller.is_admin
}

/// Whether the caller may delete the record.
pub fn can_manage(caller: &Caller, record: &VideoRecord) -> bool {
    can_read(caller, record)
}
