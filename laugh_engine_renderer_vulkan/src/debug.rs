/// Vulkan debug messenger, backend configuration and validation statistics
///
/// Validation layer messages are filtered by severity, printed with colors
/// (and/or appended to a file), counted, and grouped when they repeat.

use ash::vk;
use colored::*;
use laugh_engine::laugh::RendererConfig;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

// ===== CONFIGURATION =====

/// Which validation messages are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

impl DebugSeverity {
    /// Messenger severity mask for this level
    pub(crate) fn to_vk(self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        match self {
            DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            DebugSeverity::ErrorsAndWarnings => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            }
            DebugSeverity::All => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            }
        }
    }

    fn accepts(self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> bool {
        self.to_vk().intersects(severity)
    }
}

/// Where validation messages go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    Console,
    File(String),
    Both(String),
}

/// Vulkan backend configuration
#[derive(Debug, Clone)]
pub struct VulkanConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Enable VK_LAYER_KHRONOS_validation (only honored with the `vulkan-validation` feature)
    pub enable_validation: bool,
    pub debug_severity: DebugSeverity,
    pub debug_output: DebugOutput,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Count messages (see [`get_validation_stats`])
    pub enable_validation_stats: bool,
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            app_name: "Laugh Engine".to_string(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            break_on_validation_error: false,
            enable_validation_stats: true,
        }
    }
}

impl VulkanConfig {
    /// Backend settings carried by the renderer configuration
    pub fn from_renderer_config(config: &RendererConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            enable_validation: config.enable_validation,
            ..Self::default()
        }
    }

    /// Whether the validation layer is actually requested for this build
    pub fn validation_active(&self) -> bool {
        cfg!(feature = "vulkan-validation") && self.enable_validation
    }
}

// ===== STATISTICS =====

/// Number of validation messages received per severity
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

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn record(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) {
        let counter = if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            &self.errors
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            &self.warnings
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            &self.info
        } else {
            &self.verbose
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> ValidationStats {
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

// ===== GLOBAL STATE =====

/// Callback settings (the messenger callback has no user data)
#[derive(Clone)]
pub(crate) struct CallbackConfig {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub break_on_error: bool,
    pub enable_stats: bool,
}

impl From<&VulkanConfig> for CallbackConfig {
    fn from(config: &VulkanConfig) -> Self {
        Self {
            severity: config.debug_severity,
            output: config.debug_output.clone(),
            break_on_error: config.break_on_validation_error,
            enable_stats: config.enable_validation_stats,
        }
    }
}

static DEBUG_CONFIG: Mutex<Option<CallbackConfig>> = Mutex::new(None);

static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences per message text
static MESSAGE_COUNTS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

pub(crate) fn init_debug_config(config: CallbackConfig) {
    VALIDATION_STATS.reset();
    if let Ok(mut counts) = MESSAGE_COUNTS.lock() {
        *counts = Some(FxHashMap::default());
    }
    if let Ok(mut slot) = DEBUG_CONFIG.lock() {
        *slot = Some(config);
    }
}

/// Silence the callback before the messenger is destroyed
pub(crate) fn cleanup_debug_config() {
    if let Ok(mut slot) = DEBUG_CONFIG.lock() {
        *slot = None;
    }
}

fn track_message(message: &str) -> u32 {
    let Ok(mut guard) = MESSAGE_COUNTS.lock() else {
        return 1;
    };
    let counts = guard.get_or_insert_with(FxHashMap::default);
    let count = counts.entry(message.to_string()).or_insert(0);
    *count += 1;
    *count
}

/// Validation statistics since the device was created
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get()
}

/// Print a colored summary of the validation statistics
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());
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

    if let Ok(guard) = MESSAGE_COUNTS.lock() {
        let repeated = guard
            .as_ref()
            .map(|counts| counts.values().filter(|&&c| c > 1).count())
            .unwrap_or(0);
        if repeated > 0 {
            println!("\n  {} message(s) appeared multiple times", repeated);
        }
    }
    println!("{}\n", "====================================".bright_blue().bold());
}

// ===== CALLBACK =====

fn severity_label(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> (&'static str, ColoredString) {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        ("ERROR", "ERROR".red().bold())
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        ("WARNING", "WARNING".yellow().bold())
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        ("INFO", "INFO".cyan())
    } else {
        ("VERBOSE", "VERBOSE".bright_black())
    }
}

fn type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

/// Called by the validation layers for every message
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let config = match DEBUG_CONFIG.lock() {
        Ok(guard) => match guard.as_ref() {
            Some(cfg) => cfg.clone(),
            None => return vk::FALSE,
        },
        Err(_) => return vk::FALSE,
    };

    if p_callback_data.is_null() || !config.severity.accepts(message_severity) {
        return vk::FALSE;
    }

    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name).to_str().unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message).to_str().unwrap_or("Invalid UTF-8")
    };

    let (severity_str, severity_colored) = severity_label(message_severity);
    let type_str = type_label(message_type);

    let occurrences = if config.enable_stats {
        VALIDATION_STATS.record(message_severity);
        track_message(message)
    } else {
        1
    };
    let repeat = if occurrences > 1 {
        format!(" [x{}]", occurrences)
    } else {
        String::new()
    };

    let console_output = format!(
        "{} {} [{}]{}\n  |- {}: {}\n  `- {}\n",
        "[VULKAN".bright_blue().bold(),
        format!("{}]", severity_colored).bright_blue().bold(),
        type_str.bright_black(),
        repeat.yellow(),
        "Message ID".bright_black(),
        message_id_name.white(),
        message.white()
    );
    let file_output = format!(
        "[VULKAN {}] [{}]{}\n  |- Message ID: {}\n  `- {}\n",
        severity_str, type_str, repeat, message_id_name, message
    );

    match &config.output {
        DebugOutput::Console => eprint!("{}", console_output),
        DebugOutput::File(path) => write_to_file(path, &file_output),
        DebugOutput::Both(path) => {
            eprint!("{}", console_output);
            write_to_file(path, &file_output);
        }
    }

    if config.break_on_error && message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        eprintln!(
            "\n{}\n  Context: {} [{}]\n",
            "BREAK ON VALIDATION ERROR - Aborting execution".red().bold(),
            message_id_name.yellow(),
            type_str.cyan(),
        );
        std::process::abort();
    }

    vk::FALSE
}

fn write_to_file(path: &str, message: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", message);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
