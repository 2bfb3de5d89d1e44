pub mod completion;
pub mod interval_timer;
pub mod work_queue;
