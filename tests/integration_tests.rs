/*
 * Integration tests for Pifan
 *
 * These run the daemon pieces together against fake sysfs trees
 * in temporary directories.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pf_core::{ConfigStore, ControlConfig, StageConfig, SysfsGpio, SysfsPwm, ThermalZone};
use pifan::drive::{ContinuousDrive, DiscreteDrive};
use pifan::fan_control::{run_control_loop, ControlEvent, StopReason};
use pifan::signals::SignalListener;
use serial_test::serial;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::sleep;

// Test utilities

struct FakeSysfs {
    dir: TempDir,
}

impl FakeSysfs {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pwmchip0/pwm0")).unwrap();
        fs::create_dir_all(dir.path().join("gpio")).unwrap();
        Self { dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn add_gpio(&self, pin: u32) {
        fs::create_dir_all(self.path(&format!("gpio/gpio{}", pin))).unwrap();
    }

    fn set_temp(&self, celsius: f64) {
        let millis = (celsius * 1000.0).round() as i64;
        fs::write(self.path("temp"), format!("{}\n", millis)).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    fn write_config(&self, text: &str) -> PathBuf {
        let path = self.path("fan_control.cfg");
        fs::write(&path, text).unwrap();
        path
    }
}

fn duty(sysfs: &FakeSysfs) -> String {
    sysfs.read("pwmchip0/pwm0/duty_cycle")
}

async fn stop(tx: &mpsc::Sender<ControlEvent>) {
    tx.send(ControlEvent::Stop(StopReason::Terminate)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pwm_daemon_follows_temperature() {
    let sysfs = FakeSysfs::new();
    sysfs.set_temp(30.0);
    let config = sysfs.write_config("[fan_control]\nfan_pin = 18\npwm_freq = 25\n");

    let store = ConfigStore::with_source(ControlConfig::default(), &config);
    store.load().unwrap();
    let mut sensor = ThermalZone::new(sysfs.path("temp"));
    let mut drive = ContinuousDrive::new(SysfsPwm::new(sysfs.path("pwmchip0")));
    let (tx, mut rx) = mpsc::channel(4);

    let checker = async {
        sleep(Duration::from_millis(500)).await;
        assert_eq!(sysfs.read("pwmchip0/pwm0/period"), "40000000");
        assert_eq!(sysfs.read("pwmchip0/pwm0/enable"), "1");
        assert_eq!(duty(&sysfs), "0");

        // 57°C => 1 + 12 * 3.96 = 48.52 => 49%
        sysfs.set_temp(57.0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(duty(&sysfs), (40_000_000u64 * 49 / 100).to_string());

        // dead band holds
        sysfs.set_temp(42.0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(duty(&sysfs), (40_000_000u64 * 49 / 100).to_string());

        sysfs.set_temp(35.0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(duty(&sysfs), "0");
        stop(&tx).await;
    };

    let (result, ()) = tokio::join!(
        run_control_loop(&mut sensor, &mut drive, &store, &mut rx),
        checker
    );
    assert_eq!(result.unwrap(), StopReason::Terminate);

    // cleanup disabled and unexported the channel
    assert_eq!(sysfs.read("pwmchip0/pwm0/enable"), "0");
    assert_eq!(sysfs.read("pwmchip0/unexport"), "0");
}

#[tokio::test(start_paused = true)]
async fn test_staged_daemon_switches_gpio() {
    let sysfs = FakeSysfs::new();
    for pin in [5, 6] {
        sysfs.add_gpio(pin);
    }
    sysfs.set_temp(20.0);
    let config = sysfs.write_config(
        "# two stage fan\n[fan_control_discrete]\nfan_pins = 5, 6\non_temp = 40, 50\noff_temp = 35, 45\n",
    );

    let store = ConfigStore::with_source(StageConfig::default(), &config);
    store.load().unwrap();
    let mut sensor = ThermalZone::new(sysfs.path("temp"));
    let mut drive = DiscreteDrive::new(SysfsGpio::new(sysfs.path("gpio")));
    let (tx, mut rx) = mpsc::channel(4);

    let checker = async {
        sleep(Duration::from_millis(500)).await;
        assert_eq!(sysfs.read("gpio/gpio5/direction"), "low");
        assert_eq!(sysfs.read("gpio/gpio6/direction"), "low");

        sysfs.set_temp(55.0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sysfs.read("gpio/gpio6/value"), "1");
        assert!(!sysfs.path("gpio/gpio5/value").exists());

        // inside the band of stage 2, stays up
        sysfs.set_temp(47.0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sysfs.read("gpio/gpio6/value"), "1");

        sysfs.set_temp(44.0);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sysfs.read("gpio/gpio6/value"), "0");
        assert_eq!(sysfs.read("gpio/gpio5/value"), "1");
        stop(&tx).await;
    };

    let (result, ()) = tokio::join!(
        run_control_loop(&mut sensor, &mut drive, &store, &mut rx),
        checker
    );
    result.unwrap();

    for pin in ["gpio5", "gpio6"] {
        assert_eq!(sysfs.read(&format!("gpio/{}/value", pin)), "0");
        assert_eq!(sysfs.read(&format!("gpio/{}/direction", pin)), "in");
    }
}

#[tokio::test(start_paused = true)]
async fn test_reload_moves_fan_to_new_pin() {
    let sysfs = FakeSysfs::new();
    fs::create_dir_all(sysfs.path("pwmchip0/pwm1")).unwrap();
    sysfs.set_temp(60.0);
    let config = sysfs.write_config("[fan_control]\nfan_pin = 18\n");

    let store = ConfigStore::with_source(ControlConfig::default(), &config);
    store.load().unwrap();
    let mut sensor = ThermalZone::new(sysfs.path("temp"));
    let mut drive = ContinuousDrive::new(SysfsPwm::new(sysfs.path("pwmchip0")));
    let (tx, mut rx) = mpsc::channel(4);

    let checker = async {
        sleep(Duration::from_millis(500)).await;
        assert_eq!(sysfs.read("pwmchip0/pwm0/enable"), "1");

        sysfs.write_config("[fan_control]\nfan_pin = 19\npwm_freq = 50\n");
        tx.send(ControlEvent::Reload).await.unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(sysfs.read("pwmchip0/pwm0/enable"), "0");
        assert_eq!(sysfs.read("pwmchip0/pwm1/enable"), "1");
        assert_eq!(sysfs.read("pwmchip0/pwm1/period"), "20000000");
        // 60°C => 1 + 15 * 3.96 = 60.4 => 60%
        assert_eq!(sysfs.read("pwmchip0/pwm1/duty_cycle"), "12000000");
        stop(&tx).await;
    };

    let (result, ()) = tokio::join!(
        run_control_loop(&mut sensor, &mut drive, &store, &mut rx),
        checker
    );
    result.unwrap();
    assert_eq!(store.snapshot().fan_pin, 19);
}

#[tokio::test(start_paused = true)]
async fn test_missing_sensor_stops_and_releases() {
    let sysfs = FakeSysfs::new();
    let store = ConfigStore::new(ControlConfig::default());
    let mut sensor = ThermalZone::new(sysfs.path("no-such-zone"));
    let mut drive = ContinuousDrive::new(SysfsPwm::new(sysfs.path("pwmchip0")));
    let (_tx, mut rx) = mpsc::channel(4);

    let err = run_control_loop(&mut sensor, &mut drive, &store, &mut rx).await.unwrap_err();
    assert!(err.is_sensor_error());
    assert_eq!(sysfs.read("pwmchip0/pwm0/enable"), "0");
}

fn raise(signal: libc::c_int) {
    // SAFETY: sending a signal to our own pid; a tokio handler is registered for it.
    let rc = unsafe { libc::kill(libc::getpid(), signal) };
    assert_eq!(rc, 0);
}

async fn next_event(listener: &mut SignalListener) -> Option<ControlEvent> {
    tokio::time::timeout(Duration::from_secs(5), listener.next_event()).await.unwrap()
}

#[tokio::test]
#[serial]
async fn test_signals_map_to_control_events() {
    let mut listener = SignalListener::register().unwrap();

    raise(libc::SIGUSR1);
    assert_eq!(next_event(&mut listener).await, Some(ControlEvent::Reload));

    raise(libc::SIGHUP);
    assert_eq!(next_event(&mut listener).await, Some(ControlEvent::Reload));

    raise(libc::SIGTERM);
    assert_eq!(next_event(&mut listener).await, Some(ControlEvent::Stop(StopReason::Terminate)));

    raise(libc::SIGINT);
    assert_eq!(next_event(&mut listener).await, Some(ControlEvent::Stop(StopReason::Interrupt)));
}

#[tokio::test]
#[serial]
async fn test_sigterm_stops_running_loop() {
    let sysfs = FakeSysfs::new();
    sysfs.set_temp(20.0);
    let store = ConfigStore::new(ControlConfig::default());
    let mut sensor = ThermalZone::new(sysfs.path("temp"));
    let mut drive = ContinuousDrive::new(SysfsPwm::new(sysfs.path("pwmchip0")));

    let (tx, mut rx) = mpsc::channel(4);
    let forwarder = SignalListener::register().unwrap().forward(tx);

    let sender = async {
        sleep(Duration::from_millis(200)).await;
        raise(libc::SIGTERM);
    };
    let (result, ()) = tokio::join!(
        tokio::time::timeout(
            Duration::from_secs(5),
            run_control_loop(&mut sensor, &mut drive, &store, &mut rx)
        ),
        sender
    );

    assert_eq!(result.unwrap().unwrap(), StopReason::Terminate);
    assert_eq!(sysfs.read("pwmchip0/pwm0/enable"), "0");

    // forwarding outlives the first stop
    raise(libc::SIGINT);
    let late = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(late, Some(ControlEvent::Stop(StopReason::Interrupt)));

    // and ends once the receiver is gone
    drop(rx);
    tokio::time::timeout(Duration::from_secs(5), forwarder).await.unwrap().unwrap();
}

#[test]
fn test_check_config_against_file() {
    let sysfs = FakeSysfs::new();
    let path = sysfs.write_config("[fan_control]\nmin_temp: 50\n; comment\nwait_time = soon\n");
    let report = pifan::cli::check_config::<ControlConfig>(Path::new(&path)).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.json.contains("\"min_temp\": 50"));
}
