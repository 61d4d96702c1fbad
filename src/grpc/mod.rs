mod impls;
pub mod proto;
