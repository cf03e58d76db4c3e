use indicatif::ProgressBar;
use neuralstyle::config::TransferConfig;
use neuralstyle::logging::{Logger, TransferRecord};
use neuralstyle::math;
use neuralstyle::models::VggFeatures;
use neuralstyle::pixels;
use neuralstyle::worker::{self, TransferEvent};

/// Vertical gradient used as the content image.
fn content_image(size: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; size * size * 3];
    for y in 0..size {
        let v = (y * 255 / size.max(1)) as u8;
        for x in 0..size {
            let i = (y * size + x) * 3;
            rgb[i] = v;
            rgb[i + 1] = v;
            rgb[i + 2] = 255 - v;
        }
    }
    rgb
}

/// Two-color checkerboard used as the style image.
fn style_image(size: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; size * size * 3];
    for y in 0..size {
        for x in 0..size {
            let i = (y * size + x) * 3;
            if (x / 8 + y / 8) % 2 == 0 {
                rgb[i] = 230;
                rgb[i + 1] = 60;
                rgb[i + 2] = 40;
            } else {
                rgb[i] = 30;
                rgb[i + 1] = 40;
                rgb[i + 2] = 200;
            }
        }
    }
    rgb
}

fn main() {
    neuralstyle::util::simple_logger::init_from_env();

    let mut config = TransferConfig::default();
    if let Some(path) = std::env::args().nth(1) {
        match TransferConfig::from_path(&path) {
            Some(loaded) => config = loaded,
            None => neuralstyle::warn!("could not load config from {}, using defaults", path),
        }
    }
    // Shrink the run so the demo finishes in seconds on the small
    // reference network.
    config.image_size = 64;
    config.epochs = 5;
    config.steps_per_epoch = 2;
    config.content_layers = vec!["block2_conv1".to_string()];
    config.style_layers = vec!["block1_conv1".to_string(), "block2_conv1".to_string()];

    let size = config.image_size;
    let content =
        pixels::to_normalized_tensor(&content_image(size), size, size, size).expect("content");
    let style = pixels::to_normalized_tensor(&style_image(size), size, size, size).expect("style");

    let net = VggFeatures::new(&[1, 1]);
    math::reset_matrix_ops();

    let mut logger = Logger::new(None, None).ok();
    let bar = ProgressBar::new(100);
    let job = worker::spawn(net, config, content, style);
    let mut epoch = 0usize;
    for event in job.events.iter() {
        match event {
            TransferEvent::Progress {
                percent,
                loss,
                pixels,
            } => {
                epoch += 1;
                bar.set_position(percent as u64);
                bar.set_message(format!("loss {:.4}", loss.total()));
                if let Some(logger) = logger.as_mut() {
                    logger.log(&TransferRecord {
                        epoch,
                        percent,
                        loss: loss.total(),
                        style_loss: loss.style,
                        content_loss: loss.content,
                        tv_loss: loss.tv,
                    });
                }
                if percent >= 100.0 {
                    bar.finish_with_message(format!(
                        "done: {} bytes of RGBA, {} matrix ops",
                        pixels.len(),
                        math::matrix_ops_count()
                    ));
                }
            }
            TransferEvent::Failed(e) => {
                bar.abandon_with_message(format!("failed: {}", e));
                break;
            }
            TransferEvent::Cancelled => {
                bar.abandon_with_message("cancelled".to_string());
                break;
            }
        }
    }
    job.join();
}
