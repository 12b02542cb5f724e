#[macro_use]
extern crate serde;

pub mod content_type;
pub mod error;
pub mod s3;
pub mod s3_constant;
pub mod s3_post_policy;
pub mod s3_signer;
pub mod s3_string_to_sign;
pub mod settings;
pub mod storage;
pub mod upload_form;
pub mod validate_form;
pub mod view;

pub use content_type::*;
pub use error::*;
pub use s3::*;
pub use s3_constant::*;
pub use s3_post_policy::*;
pub use s3_signer::*;
pub use s3_string_to_sign::*;
pub use settings::*;
pub use storage::*;
pub use upload_form::*;
pub use validate_form::*;
pub use view::*;
