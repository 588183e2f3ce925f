pub mod admin;
pub mod request_id;

pub use admin::admin_auth_middleware;
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};
