//! Constants and configuration defaults for pifan
//!
//! Centralizes paths, defaults and hardware magic numbers.
//! Other modules take their values from here.

use std::time::Duration;

/// System paths
pub mod paths {
    /// Config file read at startup and on every reload
    pub const CONFIG_FILE: &str = "/etc/fan_control.cfg";

    /// CPU thermal zone, reports millidegrees Celsius
    pub const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

    /// First PWM chip exposed by the kernel
    pub const PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";

    /// Legacy sysfs GPIO root
    pub const GPIO_ROOT: &str = "/sys/class/gpio";

    /// journald socket, present on systemd hosts
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// Config file section names
pub mod sections {
    /// Section holding the continuous controller settings
    pub const CONTINUOUS: &str = "fan_control";

    /// Section holding the staged controller settings
    pub const DISCRETE: &str = "fan_control_discrete";

    /// Entries of this section apply to every other section
    pub const DEFAULT: &str = "default";
}

/// Defaults for the continuous (PWM) controller
pub mod continuous {
    /// BCM pin used to drive the PWM fan
    pub const FAN_PIN: u32 = 18;
    /// Seconds between samples
    pub const WAIT_TIME: u32 = 1;
    /// 25Hz suits Noctua PWM fans
    pub const PWM_FREQ: u32 = 25;

    /// Below this the fan is stopped (°C)
    pub const OFF_TEMP: i32 = 40;
    /// Above this the fan starts ramping (°C)
    pub const MIN_TEMP: i32 = 45;
    /// At this temperature the fan reaches FAN_HIGH (°C)
    pub const MAX_TEMP: i32 = 70;

    pub const FAN_LOW: u8 = 1;
    pub const FAN_HIGH: u8 = 100;
    pub const FAN_OFF: u8 = 0;
    pub const FAN_MAX: u8 = 100;

    /// Ramp input saturates this many degrees above MIN_TEMP
    pub const RAMP_SATURATION_DEGREES: f64 = 100.0;
}

/// Defaults for the staged (GPIO) controller
pub mod discrete {
    pub const WAIT_TIME: u32 = 1;
    pub const FAN_PINS: &[u32] = &[18];
    /// Temperature above which a given pin is turned on
    pub const ON_TEMP: &[i32] = &[43];
    /// Temperature below which a given pin is turned off
    pub const OFF_TEMP: &[i32] = &[40];
}

/// Percentage bounds shared by the duty cycle fields
pub mod percent {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;
}

/// Temperature constants
pub mod temperature {
    /// Thermal zones report millidegrees, divide by this to get Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;

    /// Lowest threshold accepted in a config (°C)
    pub const MIN_THRESHOLD: i32 = -273;
    /// Highest threshold accepted in a config (°C)
    pub const MAX_THRESHOLD: i32 = 1000;
}

/// PWM sysfs constants
pub mod pwm {
    pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

    /// Map a BCM pin to its hardware PWM channel
    ///
    /// GPIO12/GPIO18 are PWM0, GPIO13/GPIO19 are PWM1 on the Broadcom SoCs.
    pub fn channel_for_pin(pin: u32) -> Option<u32> {
        match pin {
            12 | 18 => Some(0),
            13 | 19 => Some(1),
            _ => None,
        }
    }
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Delay between polls while waiting for the kernel to create an exported node
    pub const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Polls before giving up on an exported node
    pub const EXPORT_POLL_ATTEMPTS: u32 = 50;
}

/// Config size limits
pub mod limits {
    /// Maximum number of stages in the staged controller
    pub const MAX_STAGES: usize = 32;

    /// Config files larger than this are rejected
    pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;
}
