//! File and directory commands

use super::{format_size, Session};
use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use norstore_fs::{FileType, OpenFlags};
use std::path::Path;
use std::time::Duration;

const CHUNK_SIZE: usize = 4096;

/// Create a standard progress bar style
fn create_progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
        .progress_chars("#>-");
    pb.set_style(style);
    Ok(pb)
}

fn create_spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn cmd_ls(session: &mut Session, path: &str) -> Result<()> {
    let fs = session.mounted()?;
    let dir = fs.dir_open(path)?;
    let mut count = 0;
    loop {
        let entry = match fs.dir_read(dir) {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                fs.dir_close(dir)?;
                return Err(e.into());
            }
        };
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        match entry.kind {
            FileType::Dir => println!("d {:>10}  {}/", "-", entry.name),
            FileType::File => println!("- {:>10}  {}", entry.size, entry.name),
        }
        count += 1;
    }
    fs.dir_close(dir)?;
    log::debug!("{} entries in {}", count, path);
    Ok(())
}

pub fn cmd_mkdir(session: &mut Session, path: &str) -> Result<()> {
    session.mounted()?.mkdir(path)?;
    Ok(())
}

pub fn cmd_rm(session: &mut Session, path: &str) -> Result<()> {
    session.mounted()?.remove(path)?;
    Ok(())
}

pub fn cmd_mv(session: &mut Session, from: &str, to: &str) -> Result<()> {
    session.mounted()?.rename(from, to)?;
    Ok(())
}

pub fn cmd_put(session: &mut Session, local: &Path, remote: &str) -> Result<()> {
    let data = std::fs::read(local)?;
    println!("Read {} bytes from {:?}", data.len(), local);

    let fs = session.mounted()?;
    let file = fs.open(
        remote,
        OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
    )?;

    let pb = create_progress_bar(data.len() as u64)?;
    for chunk in data.chunks(CHUNK_SIZE) {
        if let Err(e) = fs.write(file, chunk) {
            pb.abandon();
            // The handle is released even when closing fails
            if let Err(close) = fs.close(file) {
                log::warn!("closing {} after a failed write: {}", remote, close);
            }
            return Err(e.into());
        }
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let spinner = create_spinner("Programming flash...");
    let closed = fs.close(file);
    spinner.finish_and_clear();
    closed?;

    println!("Wrote {} to {}", format_size(data.len() as u64), remote);
    Ok(())
}

pub fn cmd_get(session: &mut Session, remote: &str, local: &Path) -> Result<()> {
    let fs = session.mounted()?;
    let size = fs.stat(remote)?.size;
    let file = fs.open(remote, OpenFlags::READ)?;

    let mut data = Vec::with_capacity(size as usize);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let pb = create_progress_bar(size as u64)?;
    let result = loop {
        match fs.read(file, &mut buf) {
            Ok(0) => break Ok(()),
            Ok(n) => {
                data.extend_from_slice(&buf[..n]);
                pb.inc(n as u64);
            }
            Err(e) => break Err(e),
        }
    };
    pb.finish_and_clear();
    fs.close(file)?;
    result?;

    std::fs::write(local, &data)?;
    println!("Read {} from {} into {:?}", format_size(data.len() as u64), remote, local);
    Ok(())
}

pub fn cmd_df(session: &mut Session) -> Result<()> {
    let fs = session.mounted()?;
    let used = fs.fs_size()?;
    let Some(config) = fs.config() else {
        return Err(norstore_fs::Error::NotInitialized.into());
    };
    let total = config.block_count;
    let block = config.block_size as u64;

    println!(
        "{:>12} {:>12} {:>12} {:>5}",
        "Size", "Used", "Available", "Use%"
    );
    println!(
        "{:>12} {:>12} {:>12} {:>4}%",
        format_size(total as u64 * block),
        format_size(used as u64 * block),
        format_size((total - used) as u64 * block),
        used as u64 * 100 / total as u64
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use norstore_dummy::DummyConfig;

    fn session(tag: &str) -> (Session, std::path::PathBuf) {
        let image = std::env::temp_dir().join(format!(
            "norstore-files-{}-{}.bin",
            std::process::id(),
            tag
        ));
        let _ = std::fs::remove_file(&image);
        let config = Config {
            device: DummyConfig::winbond(0x4014),
            ..Config::default()
        };
        (Session::open(&image, &config).unwrap(), image)
    }

    #[test]
    fn test_put_then_get() {
        let (mut session, image) = session("put-get");
        let local = image.with_extension("src");
        let back = image.with_extension("dst");
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&local, &payload).unwrap();

        cmd_mkdir(&mut session, "data").unwrap();
        cmd_put(&mut session, &local, "data/blob").unwrap();
        cmd_get(&mut session, "data/blob", &back).unwrap();
        assert_eq!(std::fs::read(&back).unwrap(), payload);
        assert_eq!(session.fs().open_handles(), 0);

        cmd_mv(&mut session, "data/blob", "blob").unwrap();
        cmd_rm(&mut session, "data").unwrap();
        cmd_ls(&mut session, "/").unwrap();
        cmd_df(&mut session).unwrap();

        std::fs::remove_file(&local).unwrap();
        std::fs::remove_file(&back).unwrap();
    }

    #[test]
    fn test_put_larger_than_chip_releases_handle() {
        let (mut session, image) = session("too-big");
        let local = image.with_extension("big");
        std::fs::write(&local, vec![0x5Au8; 2 * 1024 * 1024]).unwrap();

        assert!(cmd_put(&mut session, &local, "big").is_err());
        assert_eq!(session.fs().open_handles(), 0);
        cmd_df(&mut session).unwrap();

        std::fs::remove_file(&local).unwrap();
    }

    #[test]
    fn test_get_missing_file_fails() {
        let (mut session, image) = session("missing");
        let out = image.with_extension("out");
        assert!(cmd_get(&mut session, "nope", &out).is_err());
        assert!(!out.exists());
    }
}
