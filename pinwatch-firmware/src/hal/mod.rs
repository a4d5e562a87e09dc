// Hardware Abstraction Layer (HAL) Module
//
// ESP32-spezifische Implementierungen der Traits aus pinwatch-core.
// Die Treiber für MCP23008 und SSD1306 liegen in pinwatch-core,
// da sie nur embedded-hal brauchen.

pub mod led_writer;

pub use led_writer::RmtLedWriter;
