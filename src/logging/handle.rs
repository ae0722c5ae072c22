use tracing_appender::non_blocking::WorkerGuard;

/// Удерживает guard файлового writer'а, пока приложение работает.
///
/// Пока guard жив, фоновый поток `tracing_appender` пишет буфер в файл.
/// Drop guard'а дожидается, пока поток допишет накопленные строки.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Дописывает файловый буфер и освобождает guard.
    pub fn shutdown(mut self) {
        tracing::info!(
            file_sink = self.file_guard.is_some(),
            "Logging shutdown"
        );
        drop(self.file_guard.take());
    }
}
