//! Unit tests for the `photosyncctl` entrypoint module.

use super::{
    format_batch_output, format_check_output, format_dirs_output, format_scan_output,
    format_watermarks_output, parse_anchor, parse_assignment, resolve_server, EditArgs,
};
use super::{Cli, Commands};
use clap::Parser;
use photosync_core::models::{
    AspectRatio, BatchOutcome, DirListing, ExportFormat, FolderFingerprint, FolderStatus,
    ProcessMode, ScanResult, WatermarkPosition,
};

#[test]
fn resolve_server_matrix() {
    let cases = [
        (None, "http://127.0.0.1:3300".to_string()),
        (Some("   "), "http://127.0.0.1:3300".to_string()),
        (
            Some("http://localhost:8080/"),
            "http://127.0.0.1:8080".to_string(),
        ),
        (
            Some("https://photos.example.com"),
            "https://photos.example.com".to_string(),
        ),
    ];
    for (input, expected) in cases {
        assert_eq!(resolve_server(input.map(str::to_string)), expected);
    }
}

#[test]
fn parse_assignment_matrix() {
    assert_eq!(
        parse_assignment("exposure=0.5"),
        Ok(("exposure".to_string(), 0.5))
    );
    assert_eq!(
        parse_assignment(" blur = 2 "),
        Ok(("blur".to_string(), 2.0))
    );
    assert!(parse_assignment("exposure").is_err());
    assert!(parse_assignment("=1").is_err());
    assert!(parse_assignment("exposure=bright").is_err());
}

#[test]
fn parse_anchor_clamps_values() {
    let anchor = parse_anchor("120, -4").expect("anchor");
    assert_eq!((anchor.x(), anchor.y()), (100.0, 0.0));
    assert!(parse_anchor("50").is_err());
}

#[test]
fn preview_args_build_edit_config() {
    let cli = Cli::try_parse_from([
        "photosyncctl",
        "preview",
        "--output",
        "out.jpg",
        "--set",
        "exposure=0.4",
        "--set",
        "blur=1.5",
        "--position",
        "nw",
        "--rotate",
        "-90",
        "--aspect",
        "4:5",
        "--bw",
    ])
    .expect("parse preview");
    let Commands::Preview { output, edits } = cli.command else {
        panic!("expected preview command");
    };
    assert_eq!(output.to_string_lossy(), "out.jpg");

    let config = edits.controls().expect("controls").build_config();
    assert_eq!(config.number("exposure"), Some(0.4));
    assert_eq!(config.number("blur"), Some(1.5));
    assert_eq!(config.text("wm_position"), Some("nw"));
    assert_eq!(config.number("rotate_base"), Some(270.0));
    assert_eq!(config.text("aspect_ratio"), Some("4:5"));
    assert_eq!(config.flag("bw"), Some(true));
}

#[test]
fn unknown_slider_is_rejected_when_building_controls() {
    let edits = EditArgs {
        sliders: vec![("hue".to_string(), 1.0)],
        ..EditArgs::default()
    };
    assert!(edits.controls().is_err());

    let edits = EditArgs {
        rotate: Some(45),
        ..EditArgs::default()
    };
    assert!(edits.controls().is_err());
}

#[test]
fn batch_args_parse_export_options() {
    let cli = Cli::try_parse_from([
        "photosyncctl",
        "--json",
        "batch",
        "--input",
        "/shots",
        "--output",
        "/out",
        "--mode",
        "current",
        "--format",
        "webp",
        "--quality",
        "80",
        "--resize",
        "1600",
        "--delete-source",
        "--position",
        "c",
    ])
    .expect("parse batch");
    assert!(cli.json);
    let Commands::Batch {
        input,
        output,
        mode,
        format,
        quality,
        resize,
        delete_source,
        edits,
    } = cli.command
    else {
        panic!("expected batch command");
    };
    assert_eq!(input, "/shots");
    assert_eq!(output, "/out");
    assert_eq!(mode, ProcessMode::Current);
    assert_eq!(format, ExportFormat::Webp);
    assert_eq!(quality, 80);
    assert_eq!(resize, 1600);
    assert!(delete_source);
    assert_eq!(edits.position, Some(WatermarkPosition::Center));
    assert_eq!(edits.aspect, None::<AspectRatio>);
}

#[test]
fn batch_defaults_match_export_defaults() {
    let cli = Cli::try_parse_from([
        "photosyncctl",
        "batch",
        "-i",
        "/shots",
        "-o",
        "/out",
    ])
    .expect("parse batch");
    let Commands::Batch {
        mode,
        format,
        quality,
        resize,
        delete_source,
        ..
    } = cli.command
    else {
        panic!("expected batch command");
    };
    assert_eq!(mode, ProcessMode::All);
    assert_eq!(format, ExportFormat::Jpeg);
    assert_eq!(quality, 90);
    assert_eq!(resize, 0);
    assert!(!delete_source);
}

#[test]
fn invalid_cli_values_are_rejected() {
    let cases: [&[&str]; 6] = [
        &["photosyncctl", "batch", "-i", "/a", "-o", "/b", "--format", "tiff"],
        &["photosyncctl", "batch", "-i", "/a", "-o", "/b", "--mode", "some"],
        &["photosyncctl", "preview", "-o", "x.jpg", "--position", "up"],
        &["photosyncctl", "upload"],
        &["photosyncctl", "upload", "--target", "10.0.0.7"],
        &["photosyncctl", "watermark-upload"],
    ];
    for args in cases {
        assert!(Cli::try_parse_from(args).is_err(), "{:?}", args);
    }
}

#[test]
fn check_without_folder_uses_server_context() {
    let cli = Cli::try_parse_from(["photosyncctl", "check"]).expect("parse check");
    assert!(matches!(cli.command, Commands::Check { folder: None }));
}

#[test]
fn format_scan_output_marks_current_file() {
    let scan = ScanResult::new(["a.jpg", "b.jpg"], Some("b.jpg"));
    assert_eq!(
        format_scan_output(&scan, false).expect("text"),
        "  a.jpg\n* b.jpg"
    );
    let json: serde_json::Value =
        serde_json::from_str(&format_scan_output(&scan, true).expect("json")).expect("parse");
    assert_eq!(json["current_file"], "b.jpg");
    assert_eq!(json["files"][0], "a.jpg");
}

#[test]
fn format_dirs_output_joins_with_base_separator() {
    let listing = DirListing {
        parent: "C:\\".to_string(),
        items: vec!["Photos".to_string(), "Work".to_string()],
        current: Some("C:\\Users".to_string()),
    };
    let text = format_dirs_output(&listing, "C:\\Users", false).expect("text");
    assert_eq!(
        text,
        ".. -> C:\\\nC:\\Users\\Photos\nC:\\Users\\Work"
    );

    let roots = DirListing {
        parent: String::new(),
        items: vec!["C:".to_string()],
        current: None,
    };
    assert_eq!(format_dirs_output(&roots, "", false).expect("text"), "C:");
}

#[test]
fn format_check_and_batch_output() {
    let status = FolderStatus {
        fingerprint: Some(FolderFingerprint::new("abc")),
        changed: true,
        snapshot: None,
    };
    assert_eq!(
        format_check_output(&status, false).expect("text"),
        "fingerprint: abc\nchanged: true"
    );

    let outcome = BatchOutcome {
        processed: 5,
        errors: 1,
    };
    assert_eq!(
        format_batch_output(&outcome, false).expect("text"),
        "Batch complete: 5 processed, 1 errors"
    );
    let json: serde_json::Value =
        serde_json::from_str(&format_batch_output(&outcome, true).expect("json")).expect("parse");
    assert_eq!(json["processed"], 5);
}

#[test]
fn upload_and_watermark_commands_parse() {
    let cli = Cli::try_parse_from([
        "photosyncctl",
        "upload",
        "--target",
        "10.0.0.7:3000",
        "a.jpg",
        "b.jpg",
    ])
    .expect("parse upload");
    match cli.command {
        Commands::Upload { target, files } => {
            assert_eq!(target, "10.0.0.7:3000");
            assert_eq!(files.len(), 2);
        }
        _ => panic!("expected upload command"),
    }

    let cli = Cli::try_parse_from(["photosyncctl", "watermark-upload", "logos/brand.png"])
        .expect("parse watermark-upload");
    assert!(matches!(
        cli.command,
        Commands::WatermarkUpload { ref file } if file.ends_with("brand.png")
    ));
    let cli = Cli::try_parse_from(["photosyncctl", "target", "booth-2"]).expect("parse target");
    assert!(matches!(cli.command, Commands::Target { ref target } if target == "booth-2"));
}

#[test]
fn format_watermarks_output_lists_names() {
    let names = vec!["brand.png".to_string(), "corner.webp".to_string()];
    assert_eq!(
        format_watermarks_output(&names, false).expect("text"),
        "brand.png\ncorner.webp"
    );
    assert_eq!(
        format_watermarks_output(&[], false).expect("text"),
        "No watermarks"
    );
    let json: serde_json::Value =
        serde_json::from_str(&format_watermarks_output(&names, true).expect("json"))
            .expect("parse");
    assert_eq!(json[1], "corner.webp");
}
