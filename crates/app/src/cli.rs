use std::path::PathBuf;

use voxshade_core::RefinePaths;

#[derive(Debug, PartialEq)]
pub(crate) enum Command {
    Refine(CliArgs),
    Help,
}

#[derive(Debug, PartialEq)]
pub(crate) struct CliArgs {
    pub(crate) paths: RefinePaths,
    pub(crate) config: Option<PathBuf>,
}

/// Parses `argv` including the program name.
pub(crate) fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut dataset = None;
    let mut spatial = None;
    let mut selection = None;
    let mut association = None;
    let mut input = None;
    let mut output = None;
    let mut keyframes = None;
    let mut config = None;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--spatial" => &mut spatial,
            "--selection" => &mut selection,
            "--association" => &mut association,
            "--input" => &mut input,
            "--output" => &mut output,
            "--keyframes" => &mut keyframes,
            "--config" => &mut config,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            positional => {
                if dataset.is_some() {
                    return Err(format!("unexpected argument {positional}"));
                }
                dataset = Some(PathBuf::from(positional));
                continue;
            }
        };
        let value = iter
            .next()
            .ok_or_else(|| format!("{arg} requires a path"))?;
        *slot = Some(PathBuf::from(value));
    }

    let dataset = dataset.ok_or_else(|| "missing dataset directory".to_string())?;
    let mut paths = RefinePaths::with_defaults(dataset);
    for (slot, value) in [
        (&mut paths.spatial, spatial),
        (&mut paths.selection, selection),
        (&mut paths.association, association),
        (&mut paths.input, input),
        (&mut paths.output, output),
        (&mut paths.keyframes, keyframes),
    ] {
        if let Some(value) = value {
            *slot = value;
        }
    }
    Ok(Command::Refine(CliArgs { paths, config }))
}

pub(crate) fn usage() -> &'static str {
    "Usage: voxshade <dataset> [options]\n\
     \n\
     Refines a fused TSDF and estimates per-voxel albedo from keyframe images.\n\
     \n\
     Options:\n  \
     --spatial <path>      voxel coordinates and neighbor tables\n  \
     --selection <path>    data, laplacian and chroma edge indices\n  \
     --association <path>  keyframe association mask and weights\n  \
     --input <path>        fused voxel tsdf and color\n  \
     --output <path>       refined voxel archive to write\n  \
     --keyframes <path>    keyframe manifest, relative to the dataset\n  \
     --config <path>       refinement settings (JSON)\n  \
     --help                show this message"
}
