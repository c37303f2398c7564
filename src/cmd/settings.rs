use anyhow::{bail, Result};

use balancers::SettingsStore;

use super::output::{format_settings, parse_setting_value, print_json};

pub fn cmd_settings_show(settings: &SettingsStore, json: bool) -> Result<()> {
    if json {
        return print_json(&settings.get());
    }
    print!("{}", format_settings(&settings.snapshot())?);
    Ok(())
}

pub fn cmd_settings_set(settings: &SettingsStore, path: &str, raw: &str, json: bool) -> Result<()> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        bail!("Invalid settings path: {path:?}");
    }

    let value = parse_setting_value(raw);
    let state = settings.set(path, value.clone());
    if json {
        return print_json(&state);
    }
    println!("✅ {path} = {value}");
    Ok(())
}
