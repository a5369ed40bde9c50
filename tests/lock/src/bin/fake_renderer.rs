//! Renderer stand-in whose behavior is scripted by the document itself.
//!
//! Usage: `fake_renderer <document> <out_dir>`
//!
//! The document is read as lines of commands, executed in order:
//!   `page <name> <text>`       write `<out_dir>/<name>` containing `<text>`
//!   `png <name> <r> <g> <b>`   write a 4x4 solid-color PNG
//!   `stderr <text>`            write `<text>` to standard error
//!   `exit <code>`              exit with `<code>`
//!   `abort`                    terminate abnormally (SIGABRT on unix)
//! Blank lines and `#` comments are ignored. Reaching the end exits 0.

use std::path::Path;
use std::process;

use image::{Rgba, RgbaImage};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let [_, document, out_dir] = args.as_slice() else {
        eprintln!("usage: fake_renderer <document> <out_dir>");
        process::exit(64);
    };
    let out_dir = Path::new(out_dir);
    let script = std::fs::read_to_string(document).expect("document is readable");

    for line in script.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "page" => {
                let (name, text) = rest.split_once(' ').unwrap_or((rest, ""));
                std::fs::write(out_dir.join(name), text).expect("page is writable");
            }
            "png" => {
                let parts: Vec<&str> = rest.split_whitespace().collect();
                let [name, r, g, b] = parts.as_slice() else {
                    panic!("png expects <name> <r> <g> <b>, got {rest:?}");
                };
                let channel = |s: &str| s.parse::<u8>().expect("channel is 0-255");
                RgbaImage::from_pixel(4, 4, Rgba([channel(r), channel(g), channel(b), 255]))
                    .save(out_dir.join(name))
                    .expect("png is writable");
            }
            "stderr" => eprintln!("{rest}"),
            "exit" => process::exit(rest.parse().expect("exit code is an integer")),
            "abort" => process::abort(),
            other => panic!("unknown command {other:?}"),
        }
    }
}
