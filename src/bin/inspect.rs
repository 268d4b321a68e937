use anyhow::{bail, Context};
use imagedata::{Host, Settings, Value};
use std::env;
use std::path::PathBuf;

fn usage() -> String {
    "usage: imagedata-inspect <image> | <width> <height> [--settings file.json] [--invert]".to_string()
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut positional = Vec::new();
    let mut settings_path: Option<PathBuf> = None;
    let mut invert = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let path = args.next().with_context(usage)?;
                settings_path = Some(PathBuf::from(path));
            }
            "--invert" => invert = true,
            _ => positional.push(arg),
        }
    }

    let settings = match &settings_path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => Settings::default(),
    };

    // Numeric pairs are dimensions, anything else is a path
    let create_args: Vec<Value> = match positional.as_slice() {
        [path] => vec![Value::from(path.as_str())],
        [w, h] => {
            let width: i64 = w.parse().with_context(|| format!("width '{}' is not a number", w))?;
            let height: i64 = h.parse().with_context(|| format!("height '{}' is not a number", h))?;
            vec![width.into(), height.into()]
        }
        _ => bail!(usage()),
    };

    let host = Host::new(settings);
    let mut img = host.create(&create_args)?;

    let (width, height) = img.dimensions()?;
    println!("{}: {}x{} (pitch {} bytes)", img.type_name(), width, height, img.buffer()?.pitch());
    println!("pixel (0, 0): {:?}", img.get(&[0.into(), 0.into()])?);

    if invert {
        img.map(&[Value::function(|args| {
            let channel = |i: usize| args[i].as_integer().unwrap_or(0);
            Ok(vec![
                Value::from(255 - channel(2)),
                Value::from(255 - channel(3)),
                Value::from(255 - channel(4)),
                Value::from(channel(5)),
            ])
        })])?;
        println!("inverted pixel (0, 0): {:?}", img.get(&[0.into(), 0.into()])?);
    }

    println!("{}", serde_json::to_string_pretty(&host.registry_snapshot())?);
    Ok(())
}
