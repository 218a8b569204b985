#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::*;

#[cfg(all(desktop, not(any(target_os = "windows", target_os = "macos"))))]
mod linux;
#[cfg(all(desktop, not(any(target_os = "windows", target_os = "macos"))))]
pub use self::linux::*;

#[cfg(target_os = "macos")]
mod focus;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use self::macos::*;

/// Opens `url` with the system handler and returns without waiting for it.
#[cfg(desktop)]
pub fn launch_url(url: &url::Url) -> std::io::Result<()> {
    opener_command(url).spawn().map(|_| ())
}

#[cfg(mobile)]
pub fn launch_url(_url: &url::Url) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "the native plugin opens wake URLs on mobile",
    ))
}

#[cfg(target_os = "macos")]
fn opener_command(url: &url::Url) -> std::process::Command {
    let mut command = std::process::Command::new("open");
    command.arg(url.as_str());
    command
}

#[cfg(target_os = "windows")]
fn opener_command(url: &url::Url) -> std::process::Command {
    let mut command = std::process::Command::new("cmd");
    command.args(["/C", "start", "", url.as_str()]);
    command
}

#[cfg(all(desktop, not(any(target_os = "windows", target_os = "macos"))))]
fn opener_command(url: &url::Url) -> std::process::Command {
    let mut command = std::process::Command::new("xdg-open");
    command.arg(url.as_str());
    command
}
