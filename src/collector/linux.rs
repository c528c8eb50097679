// Linux-specific helpers: /proc/net/wireless.

use super::CollectError;
use crate::models::MetricValues;

/// Drivers report link quality out of 70 (the iwconfig scale).
const LINK_QUALITY_MAX: f64 = 70.0;

/// Noise level reported by drivers that do not measure it.
const NOISE_UNAVAILABLE: f64 = -256.0;

pub(super) fn read_wireless(interface: Option<&str>) -> Result<MetricValues, CollectError> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/net/wireless")?;
        parse_proc_wireless(&content, interface)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = interface;
        Err(CollectError::Unsupported)
    }
}

/// Parses `/proc/net/wireless` content for `interface` (or the first listed one).
///
/// ```text
/// Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
///  face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
///  wlan0: 0000   54.  -56.  -256        0      0      0      0      0        0
/// ```
pub fn parse_proc_wireless(
    content: &str,
    interface: Option<&str>,
) -> Result<MetricValues, CollectError> {
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if interface.is_some_and(|wanted| wanted != name) {
            continue;
        }

        let fields: Vec<&str> = rest.split_whitespace().collect();
        // status, link, level, noise
        if fields.len() < 4 {
            return Err(CollectError::Parse(line.trim().to_string()));
        }
        let link = parse_field(fields[1], line)?;
        let level = parse_field(fields[2], line)?;
        let noise = parse_field(fields[3], line)?;

        let mut values = MetricValues::new();
        values.insert(
            "link_quality".into(),
            (link / LINK_QUALITY_MAX * 100.0).clamp(0.0, 100.0),
        );
        values.insert("signal_dbm".into(), level);
        if noise > NOISE_UNAVAILABLE {
            values.insert("noise_dbm".into(), noise);
        }
        return Ok(values);
    }
    match interface {
        Some(wanted) => Err(CollectError::InterfaceNotFound(wanted.to_string())),
        None => Err(CollectError::NoInterface),
    }
}

/// Values carry a trailing '.' when the driver reports them as updated.
fn parse_field(raw: &str, line: &str) -> Result<f64, CollectError> {
    raw.trim_end_matches('.')
        .parse::<f64>()
        .map_err(|_| CollectError::Parse(line.trim().to_string()))
}
