use crate::{FatError, FatVariant};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OEM_NAME: &[u8; 8] = b"FATKIT  ";
pub const DEFAULT_VOLUME_LABEL: &[u8; 11] = b"NO NAME    ";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOptions {
    pub variant: FatVariant,
    /// Image capacity in whole MiB.
    pub size_mb: u32,
    pub label: Option<String>,
    pub oem_name: Option<String>,
    /// `None` derives a serial from the current time.
    pub volume_serial: Option<u32>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            variant: FatVariant::Fat16,
            size_mb: 16,
            label: None,
            oem_name: None,
            volume_serial: None,
        }
    }
}

impl FormatOptions {
    pub fn new(variant: FatVariant, size_mb: u32) -> Self {
        Self {
            variant,
            size_mb,
            ..Default::default()
        }
    }

    /// Upper-cased, space padded 11-byte volume label.
    pub fn volume_label_bytes(&self) -> Result<[u8; 11], FatError> {
        match &self.label {
            None => Ok(*DEFAULT_VOLUME_LABEL),
            Some(label) => {
                let upper = label.to_ascii_uppercase();
                if upper != *label {
                    debug!("Volume label {:?} stored as {:?}", label, upper);
                }
                pad_ascii::<11>(&upper, "volume label")
            }
        }
    }

    pub fn oem_name_bytes(&self) -> Result<[u8; 8], FatError> {
        match &self.oem_name {
            None => Ok(*DEFAULT_OEM_NAME),
            Some(name) => pad_ascii::<8>(name, "OEM name"),
        }
    }

    pub fn resolve_serial(&self) -> u32 {
        self.volume_serial.unwrap_or_else(generate_volume_serial)
    }
}

fn pad_ascii<const N: usize>(text: &str, what: &str) -> Result<[u8; N], FatError> {
    if !text.is_ascii() {
        return Err(FatError::InvalidInput(format!("{} must be ASCII: {:?}", what, text)));
    }
    if text.len() > N {
        return Err(FatError::InvalidInput(format!(
            "{} {:?} is longer than {} bytes",
            what, text, N
        )));
    }
    let mut out = [b' '; N];
    out[..text.len()].copy_from_slice(text.as_bytes());
    Ok(out)
}

/// Volume serial in the DOS style: date and time words folded together.
pub fn generate_volume_serial() -> u32 {
    let now = chrono::Utc::now();
    let secs = now.timestamp() as u32;
    let nanos = now.timestamp_subsec_nanos();
    secs.rotate_left(16) ^ nanos
}

/// Summary of a formatted (or planned) image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatReport {
    pub variant: FatVariant,
    pub size_mb: u32,
    pub total_sectors: u64,
    pub sectors_per_cluster: u8,
    pub cluster_count: u32,
    pub sectors_per_fat: u32,
    pub reserved_sectors: u16,
    pub root_entries: u16,
    pub root_dir_sectors: u32,
    pub data_start_sector: u64,
    pub volume_serial: u32,
    pub volume_label: String,
}

impl FormatReport {
    /// Pretty-printed JSON form, as emitted by `--json`.
    pub fn to_json(&self) -> Result<String, FatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_label_and_oem() {
        let options = FormatOptions::new(FatVariant::Fat32, 64);
        assert_eq!(&options.volume_label_bytes().unwrap(), b"NO NAME    ");
        assert_eq!(&options.oem_name_bytes().unwrap(), b"FATKIT  ");
    }

    #[test]
    fn test_label_is_uppercased_and_padded() {
        let options = FormatOptions {
            label: Some("boot".to_string()),
            ..Default::default()
        };
        assert_eq!(&options.volume_label_bytes().unwrap(), b"BOOT       ");
    }

    #[test]
    fn test_label_too_long_is_rejected() {
        let options = FormatOptions {
            label: Some("ABCDEFGHIJKL".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            options.volume_label_bytes(),
            Err(FatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_ascii_oem_is_rejected() {
        let options = FormatOptions {
            oem_name: Some("ÉCOLE".to_string()),
            ..Default::default()
        };
        assert!(options.oem_name_bytes().is_err());
    }

    #[test]
    fn test_explicit_serial_wins() {
        let options = FormatOptions {
            volume_serial: Some(0x1234_5678),
            ..Default::default()
        };
        assert_eq!(options.resolve_serial(), 0x1234_5678);
    }

    #[test]
    fn test_report_json() {
        let report = FormatReport {
            variant: FatVariant::Fat16,
            size_mb: 16,
            total_sectors: 32768,
            sectors_per_cluster: 1,
            cluster_count: 32481,
            sectors_per_fat: 127,
            reserved_sectors: 1,
            root_entries: 512,
            root_dir_sectors: 32,
            data_start_sector: 287,
            volume_serial: 0xCAFE_F00D,
            volume_label: "NO NAME".to_string(),
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"variant\": \"fat16\""));
        let back: FormatReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_options_json_roundtrip() {
        let options = FormatOptions {
            variant: FatVariant::Fat32,
            size_mb: 128,
            label: Some("DATA".to_string()),
            oem_name: None,
            volume_serial: Some(7),
        };
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"fat32\""));
        let back: FormatOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.size_mb, 128);
        assert_eq!(back.label.as_deref(), Some("DATA"));
    }
}
