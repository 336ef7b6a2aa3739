use std::path::Path;

use symphonia::core::{
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::{MetadataOptions, StandardTagKey, Tag},
    probe::{Hint, ProbeResult},
};

/// What the media prober knows about an input before analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub duration: Option<f64>,
    pub title: Option<String>,
}

pub fn get_probe(path: &Path) -> anyhow::Result<ProbeResult> {
    let src = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }
    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    Ok(symphonia::default::get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?)
}

pub fn probe(path: &Path) -> anyhow::Result<MediaInfo> {
    let mut probed = get_probe(path)?;

    // container tags first, then tags found while probing (ID3 and friends)
    let mut tags: Vec<Tag> = probed
        .format
        .metadata()
        .current()
        .map(|rev| rev.tags().to_vec())
        .unwrap_or_default();
    if let Some(meta) = probed.metadata.get()
        && let Some(rev) = meta.current()
    {
        tags.extend(rev.tags().iter().cloned());
    }

    let duration = probed.format.default_track().and_then(|track| {
        let params = &track.codec_params;
        let n_frames = params.n_frames?;
        match (params.time_base, params.sample_rate) {
            (Some(tb), _) => {
                let t = tb.calc_time(n_frames);
                Some(t.seconds as f64 + t.frac)
            }
            (None, Some(rate)) if rate > 0 => Some(n_frames as f64 / rate as f64),
            _ => None,
        }
    });

    Ok(MediaInfo {
        duration,
        title: title_from_tags(&tags),
    })
}

/// `"artist - title"`, or the title alone.
pub fn title_from_tags(tags: &[Tag]) -> Option<String> {
    let find = |key: StandardTagKey| {
        tags.iter()
            .find(|tag| tag.std_key == Some(key))
            .map(|tag| tag.value.to_string().trim().to_string())
            .filter(|value| !value.is_empty())
    };
    let title = find(StandardTagKey::TrackTitle)?;
    match find(StandardTagKey::Artist) {
        Some(artist) => Some(format!("{artist} - {title}")),
        None => Some(title),
    }
}

pub fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
