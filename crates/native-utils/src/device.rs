use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Returns the input device with the given name, or the host default when no
/// name is provided.
pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device"));
    };

    for device in host.input_devices()? {
        if device.name().is_ok_and(|name| name == target) {
            return Ok(device);
        }
    }
    Err(anyhow::anyhow!("No input device named {target:?}"))
}

/// Returns the output device with the given name, or the host default when no
/// name is provided.
pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();

    let Some(target) = device_name else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device"));
    };

    for device in host.output_devices()? {
        if device.name().is_ok_and(|name| name == target) {
            return Ok(device);
        }
    }
    Err(anyhow::anyhow!("No output device named {target:?}"))
}

/// Lists the host's input and output devices, one per line, marking defaults.
pub fn describe_devices() -> anyhow::Result<String> {
    let host = get_host();
    let mut lines: Vec<String> = Vec::new();

    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    lines.push("Input devices:".to_string());
    for device in host.input_devices()? {
        let name = device.name()?;
        let config = device.default_input_config()?;
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_input.as_ref() {
            line.push_str(" [default]");
        }
        lines.push(line);
    }

    let default_output = host.default_output_device().and_then(|d| d.name().ok());
    lines.push("Output devices:".to_string());
    for device in host.output_devices()? {
        let name = device.name()?;
        let config = device.default_output_config()?;
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_output.as_ref() {
            line.push_str(" [default]");
        }
        lines.push(line);
    }

    Ok(lines.join("\n"))
}
