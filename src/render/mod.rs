pub mod caption;
pub mod compositor;
pub mod transition;
