#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use img_budget::{encode_gif, encode_jpeg, encode_png, PngSettings};
use std::fs;
use std::path::{Path, PathBuf};

/// Deterministic high-entropy image; compresses poorly in every format.
pub fn noise_image(width: u32, height: u32, seed: u32) -> DynamicImage {
    let mut state = seed.max(1);
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        Rgb([next(), next(), next()])
    }))
}

pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

pub fn write_png(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode_png(img, PngSettings::default()).unwrap()).unwrap();
    path
}

pub fn write_jpeg(dir: &Path, name: &str, img: &DynamicImage, quality: u8) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode_jpeg(img, quality).unwrap()).unwrap();
    path
}

pub fn write_gif(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode_gif(img).unwrap()).unwrap();
    path
}

/// Insert a private ancillary chunk of `padding` bytes after IHDR.
///
/// Decoders skip it and re-encoding drops it, so the file grows without the
/// pixels changing.
pub fn pad_png(png: &[u8], padding: usize) -> Vec<u8> {
    // 8-byte signature + IHDR (4 length + 4 type + 13 data + 4 crc)
    let ihdr_end = 8 + 25;
    let chunk_type = *b"paDd";
    let data = vec![0xA5u8; padding];

    let mut chunk = Vec::with_capacity(padding + 12);
    chunk.extend_from_slice(&(padding as u32).to_be_bytes());
    chunk.extend_from_slice(&chunk_type);
    chunk.extend_from_slice(&data);
    let mut crc_input = chunk_type.to_vec();
    crc_input.extend_from_slice(&data);
    chunk.extend_from_slice(&crc32fast::hash(&crc_input).to_be_bytes());

    let mut out = png[..ihdr_end].to_vec();
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&png[ihdr_end..]);
    out
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
