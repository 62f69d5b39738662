use signbook::capture::raster::png_from_data_uri;
use signbook::capture::{CanvasSize, PenStyle, Point, SignaturePad};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn golden_path() -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push("signature_zigzag.img");
    p
}

fn zigzag_pad() -> SignaturePad {
    let mut pad = SignaturePad::new();
    pad.draw_stroke([
        Point::new(40.0, 100.0),
        Point::new(120.0, 20.0),
        Point::new(200.0, 100.0),
        Point::new(280.0, 20.0),
    ]);
    pad.draw_stroke([Point::new(400.0, 60.0)]);
    pad
}

fn decode(png_data: &[u8]) -> (u32, u32, Vec<u8>) {
    let decoder = png::Decoder::new(png_data);
    let mut reader = decoder.read_info().expect("decode");
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).expect("frame");
    buf.truncate(info.buffer_size());
    (info.width, info.height, buf)
}

fn pixel(bytes: &[u8], width: u32, x: u32, y: u32) -> &[u8] {
    let i = ((y * width + x) * 4) as usize;
    &bytes[i..i + 4]
}

#[test]
fn exported_signature_is_a_png_data_uri() {
    let pad = zigzag_pad();
    let uri = pad.export().expect("export");
    let png_data = png_from_data_uri(&uri).expect("data uri");

    assert_eq!(&png_data[0..8], b"\x89PNG\r\n\x1a\n");

    // If UPDATE_GOLDENS is set, overwrite the golden file
    let gpath = golden_path();
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all(gpath.parent().unwrap()).ok();
        fs::write(&gpath, hex::encode(&png_data)).expect("write golden");
        eprintln!("Updated capture golden: {:?}", gpath);
        return;
    }

    if gpath.exists() {
        let exp_hex = fs::read_to_string(&gpath).expect("read golden");
        let exp_bytes = hex::decode(exp_hex.trim()).expect("invalid hex in golden");
        assert_eq!(png_data, exp_bytes, "PNG output does not match golden");
        return;
    }

    let (width, height, bytes) = decode(&png_data);
    assert_eq!(width, 800);
    assert_eq!(height, 120);

    // Stroke vertices are painted with the white pen...
    assert_eq!(pixel(&bytes, width, 120, 20), &[255, 255, 255, 255]);
    assert_eq!(pixel(&bytes, width, 400, 60), &[255, 255, 255, 255]);
    // ...and the background stays transparent.
    assert_eq!(pixel(&bytes, width, 700, 10)[3], 0);
    assert_eq!(pixel(&bytes, width, 0, 0)[3], 0);
}

#[test]
fn custom_surface_and_pen_are_honoured() {
    let mut pad = SignaturePad::with_size(CanvasSize {
        width: 64,
        height: 32,
    })
    .with_pen(PenStyle {
        color: (0, 0, 0, 255),
        width: 4.0,
    })
    .with_background((255, 255, 255, 255));
    pad.draw_stroke([Point::new(8.0, 16.0), Point::new(56.0, 16.0)]);

    let img = pad.export_png().expect("export");
    assert_eq!((img.width, img.height), (64, 32));

    let (width, _, bytes) = decode(&img.png_data);
    assert_eq!(pixel(&bytes, width, 32, 16), &[0, 0, 0, 255]);
    assert_eq!(pixel(&bytes, width, 32, 2), &[255, 255, 255, 255]);
}

#[test]
fn clear_then_export_is_refused() {
    let mut pad = zigzag_pad();
    assert!(pad.export().is_ok());
    pad.clear();
    pad.clear();
    assert!(pad.is_empty());
    assert!(matches!(pad.export(), Err(signbook::Error::EmptySignature)));
}

#[test]
fn stroke_far_off_the_surface_exports_promptly() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut pad = SignaturePad::new();
        pad.draw_stroke([Point::new(10.0, 10.0), Point::new(1.0e12, 10.0)]);
        pad.draw_stroke([Point::new(-1.0e30, 60.0), Point::new(1.0e30, 60.0)]);
        let _ = tx.send(pad.export());
    });

    let uri = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("export did not finish")
        .expect("export");
    let (width, _, bytes) = decode(&png_from_data_uri(&uri).unwrap());
    assert_eq!(pixel(&bytes, width, 500, 10), &[255, 255, 255, 255]);
    assert_eq!(pixel(&bytes, width, 799, 60), &[255, 255, 255, 255]);
    assert_eq!(pixel(&bytes, width, 5, 10)[3], 0);
}
