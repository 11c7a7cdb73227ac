//! Output streaming via cpal.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host};

use crate::realtime::GraphRenderer;
use crate::{Error, Result};

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Output device information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Default channel count.
    pub channels: u16,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

/// Output stream settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Buffer size in frames.
    pub buffer_size: u32,
    /// Substring of the output device name (uses default if `None`).
    pub device: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            buffer_size: 256,
            device: None,
        }
    }
}

fn describe(device: &Device, default_name: Option<&str>) -> Option<AudioDevice> {
    let name = device_name(device).ok()?;
    let config = device.default_output_config().ok()?;
    Some(AudioDevice {
        is_default: default_name == Some(name.as_str()),
        name,
        default_sample_rate: config.sample_rate(),
        channels: config.channels(),
    })
}

/// List output devices on the default host.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let outputs = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;
    Ok(outputs
        .filter_map(|device| describe(&device, default_name.as_deref()))
        .collect())
}

/// The host's default output device, if any.
pub fn default_output_device() -> Result<Option<AudioDevice>> {
    let host = cpal::default_host();
    Ok(host.default_output_device().and_then(|d| {
        let name = device_name(&d).ok();
        describe(&d, name.as_deref())
    }))
}

fn find_output_device(host: &Host, name: Option<&str>) -> Result<Device> {
    match name {
        Some(search) => {
            let search_lower = search.to_lowercase();
            let devices = host
                .output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?;

            for device in devices {
                if let Ok(dev_name) = device_name(&device) {
                    if dev_name.to_lowercase().contains(search_lower.as_str()) {
                        return Ok(device);
                    }
                }
            }
            Err(Error::DeviceNotFound(format!(
                "no output device matching '{}'",
                search
            )))
        }
        None => host.default_output_device().ok_or(Error::NoDevice),
    }
}

/// A running output stream. Audio stops when this is dropped.
pub struct OutputStream {
    _stream: cpal::Stream,
    device: String,
    sample_rate: u32,
    channels: u16,
}

impl OutputStream {
    /// Name of the device being played.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Stream sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("device", &self.device)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Open an output stream that pulls every block from `renderer`.
///
/// The renderer's sample rate should match `config.sample_rate`; the stream
/// uses the device's default channel count and duplicates the mono signal.
pub fn start_output(config: &OutputConfig, mut renderer: GraphRenderer) -> Result<OutputStream> {
    let host = cpal::default_host();
    let device = find_output_device(&host, config.device.as_deref())?;
    let device_label = device_name(&device).unwrap_or_else(|_| "unknown".to_string());
    let channels = device
        .default_output_config()
        .map(|c| c.channels())
        .unwrap_or(2);

    if (renderer.sample_rate() - config.sample_rate as f32).abs() > f32::EPSILON {
        tracing::warn!(
            renderer = renderer.sample_rate(),
            stream = config.sample_rate,
            "renderer and stream sample rates differ"
        );
    }

    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: config.sample_rate,
        buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
    };

    let channel_count = usize::from(channels);
    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                renderer.render_interleaved(data, channel_count);
            },
            move |err| {
                tracing::error!(%err, "output stream error");
            },
            None,
        )
        .map_err(|e| Error::Stream(e.to_string()))?;

    stream.play().map_err(|e| Error::Stream(e.to_string()))?;
    tracing::info!(
        device = %device_label,
        channels,
        sample_rate = config.sample_rate,
        buffer_size = config.buffer_size,
        "output stream started"
    );

    Ok(OutputStream {
        _stream: stream,
        device: device_label,
        sample_rate: config.sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = OutputConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 256);
        assert!(config.device.is_none());
    }

    #[test]
    fn list_devices_does_not_panic() {
        // Device availability depends on the system.
        let _ = list_devices();
    }

    #[test]
    fn missing_device_is_reported() {
        let host = cpal::default_host();
        match find_output_device(&host, Some("no-such-device-7f3a")) {
            Err(Error::DeviceNotFound(msg)) => assert!(msg.contains("no-such-device-7f3a")),
            // Hosts without output enumeration report a stream error instead.
            Err(Error::Stream(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
