/// Vulkan debug messenger - routes validation layer messages to the engine logger
///
/// Messages are counted per severity and repeated messages are grouped, so a
/// message flooding every frame shows up with its repetition count.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use vu_render::vu::log::LogSeverity;
use vu_render::vu::Engine;

/// Validation message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

struct StatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl StatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn count(&self, severity: LogSeverity) {
        let counter = match severity {
            LogSeverity::Error => &self.errors,
            LogSeverity::Warn => &self.warnings,
            LogSeverity::Info | LogSeverity::Debug => &self.info,
            LogSeverity::Trace => &self.verbose,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

static VALIDATION_STATS: StatsTracker = StatsTracker::new();

/// Occurrences per message text. The callback may run on driver threads.
static MESSAGE_COUNTS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Clear counters and message history (called when a renderer is created)
pub fn reset_validation_stats() {
    VALIDATION_STATS.reset();
    if let Ok(mut counts) = MESSAGE_COUNTS.lock() {
        *counts = Some(FxHashMap::default());
    }
}

pub fn validation_stats() -> ValidationStats {
    VALIDATION_STATS.snapshot()
}

/// Print the counters to stdout
pub fn print_validation_stats_report() {
    let stats = validation_stats();
    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics ===".bright_blue().bold());
    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    let repeated = MESSAGE_COUNTS
        .lock()
        .ok()
        .and_then(|counts| counts.as_ref().map(|c| c.values().filter(|&&n| n > 1).count()))
        .unwrap_or(0);
    if repeated > 0 {
        println!("  {} message(s) appeared more than once", repeated);
    }
}

/// Engine log severity of a validation message
pub fn severity_of(flags: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if flags.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Debug
    } else {
        LogSeverity::Trace
    }
}

pub fn message_type_label(flags: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if flags.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

fn track(message: &str) -> u32 {
    let Ok(mut counts) = MESSAGE_COUNTS.lock() else {
        return 1;
    };
    let count = counts.get_or_insert_with(FxHashMap::default).entry(message.to_string()).or_insert(0);
    *count += 1;
    *count
}

/// Severity flags the messenger subscribes to
pub fn subscribed_severities() -> vk::DebugUtilsMessageSeverityFlagsEXT {
    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        std::borrow::Cow::Borrowed(fallback)
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Vulkan debug messenger callback
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let severity = severity_of(message_severity);
    VALIDATION_STATS.count(severity);

    let occurrences = track(&message);
    let repeat = if occurrences > 1 { format!(" [x{}]", occurrences) } else { String::new() };

    Engine::log(
        severity,
        "vu::vulkan::validation",
        format!("[{}] {}{}: {}", message_type_label(message_type), message_id, repeat, message),
    );

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_of(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), LogSeverity::Error);
        assert_eq!(severity_of(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), LogSeverity::Warn);
        assert_eq!(severity_of(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), LogSeverity::Debug);
        assert_eq!(severity_of(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), LogSeverity::Trace);
    }

    #[test]
    fn test_message_type_label() {
        assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), "Validation");
        assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
        assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
    }

    #[test]
    fn test_repeated_messages_are_counted() {
        let text = "test_repeated_messages_are_counted unique message";
        assert_eq!(track(text), 1);
        assert_eq!(track(text), 2);
    }

    #[test]
    fn test_stats_total() {
        let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
        assert_eq!(stats.total(), 10);
    }
}
