pub mod oauth;
pub mod x;
