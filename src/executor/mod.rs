//! Приоритетный пул потоков для фоновых вычислений (генерация и загрузка
//! чанков), чьи приоритеты меняются, пока задачи ждут в очереди.

pub mod priority;
pub mod queue;
pub mod task;

pub use priority::*;
pub use queue::*;
pub use task::*;
