pub mod item;
pub mod job_work;
pub mod movement;
pub mod purchase_indent;
pub mod purchase_indent_item;
pub mod purchase_order;
pub mod purchase_order_item;
