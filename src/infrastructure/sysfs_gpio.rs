// Sysfs GPIO writer for the relay lines
use crate::application::relay_service::GpioPort;
use std::fs;
use std::path::PathBuf;

/// Drives pins through the legacy `/sys/class/gpio` interface. A pin that is
/// already exported is unexported first so the direction is always reset.
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl GpioPort for SysfsGpio {
    fn write(&self, pin: u32, level: u8) -> std::io::Result<()> {
        let pin_dir = self.root.join(format!("gpio{pin}"));
        if pin_dir.exists() {
            fs::write(self.root.join("unexport"), pin.to_string())?;
        }
        fs::write(self.root.join("export"), pin.to_string())?;
        fs::write(pin_dir.join("direction"), "out")?;
        fs::write(pin_dir.join("value"), level.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_sequence_on_exported_pin() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("gpio538")).unwrap();

        SysfsGpio::new(root.path()).write(538, 0).unwrap();

        let read = |name: &str| fs::read_to_string(root.path().join(name)).unwrap();
        assert_eq!(read("unexport"), "538");
        assert_eq!(read("export"), "538");
        assert_eq!(read("gpio538/direction"), "out");
        assert_eq!(read("gpio538/value"), "0");
    }

    #[test]
    fn test_missing_pin_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let err = SysfsGpio::new(root.path()).write(532, 1);
        assert!(err.is_err());
        assert!(!root.path().join("unexport").exists());
    }
}
