use crate::formats::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "guest-photos",
    about = "Upload and moderate cafe guest photos",
    long_about = "guest-photos strips metadata from guest photos, resizes and re-encodes them, \
                  generates square thumbnails and uploads everything to object storage, \
                  recording each photo against a venue for later moderation.",
    version,
    after_help = "EXAMPLES:\n  \
    guest-photos venues add \"Corner Cafe\" --address \"2 High St\" --value 4\n  \
    guest-photos upload ./photos -r --venue 4\n  \
    guest-photos upload a.jpg b.png --venue 4 --dry-run\n  \
    guest-photos photos list --all\n  \
    guest-photos optimize input.jpg output.webp -w 1280"
)]
pub struct Args {
    #[arg(long, global = true, help = "JSON configuration file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long, global = true, help = "Show debug output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Process and upload a batch of photos for a venue",
        long_about = "Collect images from files, directories or glob patterns, validate them, \
                      then process and upload them one after another. Files that fail are \
                      reported at the end; the rest of the batch still goes through."
    )]
    Upload {
        #[arg(
            required = true,
            help = "Image files, directories or glob patterns",
            long_help = "Inputs can be file paths, directories, or glob expressions. \
                         Examples: './photos', '*.jpg', '/path/to/photos/*.png'"
        )]
        inputs: Vec<String>,

        #[arg(
            long,
            help = "Venue id or numeric venue value",
            long_help = "Venue the photos belong to, given either as its id or as the \
                         numeric value used in venue links."
        )]
        venue: String,

        #[arg(short = 'r', long, help = "Search directories recursively")]
        recursive: bool,

        #[arg(
            short = 'q',
            long,
            help = "Encoder quality (0-1, default: 0.8)",
            long_help = "Encoder quality greater than 0 and at most 1. \
                         For PNG: >=0.9 uses Zopfli, >=0.7 uses high compression, below uses standard compression."
        )]
        quality: Option<f32>,

        #[arg(short = 'w', long, help = "Maximum width in pixels (default: 1920)")]
        max_width: Option<u32>,

        #[arg(short = 'H', long, help = "Maximum height in pixels (default: 1920)")]
        max_height: Option<u32>,

        #[arg(short = 'f', long, help = "Output format (webp, jpeg, png)")]
        format: Option<OutputFormat>,

        #[arg(long, help = "Thumbnail side length in pixels (default: 300)")]
        thumbnail_size: Option<u32>,

        #[arg(
            long,
            help = "Run the whole pipeline without touching remote storage or the catalog",
            long_help = "Process and 'upload' into an in-memory store and a throwaway copy \
                         of the catalog. Nothing is written."
        )]
        dry_run: bool,
    },

    #[command(
        about = "Optimize a single image file",
        long_about = "Resize and re-encode a single image. The output format comes from --format, \
                      otherwise from the output file extension, otherwise WebP."
    )]
    Optimize {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(help = "Output image file path")]
        output: PathBuf,

        #[arg(short = 'q', long, help = "Encoder quality (0-1, default: 0.8)")]
        quality: Option<f32>,

        #[arg(short = 'w', long, help = "Maximum width in pixels (default: 1920)")]
        max_width: Option<u32>,

        #[arg(short = 'H', long, help = "Maximum height in pixels (default: 1920)")]
        max_height: Option<u32>,

        #[arg(short = 'f', long, help = "Output format (webp, jpeg, png)")]
        format: Option<OutputFormat>,
    },

    #[command(about = "Generate a square WebP thumbnail")]
    Thumbnail {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(help = "Output thumbnail path")]
        output: PathBuf,

        #[arg(short = 's', long, help = "Side length in pixels (default: 300)")]
        size: Option<u32>,
    },

    #[command(
        about = "Check whether an image would be accepted for upload",
        long_about = "Run the pre-upload checks: file size, media type, readability \
                      and minimum dimensions."
    )]
    Validate {
        #[arg(help = "Image file path to check")]
        input: PathBuf,
    },

    #[command(about = "Manage the storage bucket")]
    Bucket {
        #[command(subcommand)]
        command: BucketCommand,
    },

    #[command(about = "Manage venues")]
    Venues {
        #[command(subcommand)]
        command: VenueCommand,
    },

    #[command(about = "Manage participants signed up at venues")]
    Participants {
        #[command(subcommand)]
        command: ParticipantCommand,
    },

    #[command(about = "List and moderate uploaded photos")]
    Photos {
        #[command(subcommand)]
        command: PhotoCommand,
    },
}

#[derive(Subcommand)]
pub enum BucketCommand {
    #[command(about = "Create the photo bucket if it does not exist yet")]
    Ensure,
}

#[derive(Subcommand)]
pub enum VenueCommand {
    #[command(about = "List venues ordered by name")]
    List,

    #[command(about = "Add a venue")]
    Add {
        #[arg(help = "Venue name")]
        name: String,

        #[arg(long, help = "Street address")]
        address: String,

        #[arg(long, help = "Numeric value used in venue links")]
        value: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum ParticipantCommand {
    #[command(about = "List participants ordered by name")]
    List {
        #[arg(long, help = "Filter by name, instagram handle or venue name")]
        search: Option<String>,
    },

    #[command(about = "Add a participant to a venue")]
    Add {
        #[arg(help = "Participant name")]
        name: String,

        #[arg(long, help = "Venue id or value")]
        venue: String,

        #[arg(long, help = "Instagram handle")]
        instagram: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PhotoCommand {
    #[command(about = "List photos, newest first")]
    List {
        #[arg(long, help = "Only photos for this venue (id or value)")]
        venue: Option<String>,

        #[arg(long, help = "Include photos still awaiting approval")]
        all: bool,

        #[arg(long, default_value_t = 0, help = "Page number, starting at 0")]
        page: usize,

        #[arg(long, default_value_t = crate::constants::DEFAULT_PAGE_SIZE, help = "Photos per page")]
        limit: usize,
    },

    #[command(about = "Approve a photo for public display")]
    Approve {
        #[arg(help = "Photo id")]
        id: Uuid,
    },

    #[command(about = "Withdraw approval of a photo")]
    Reject {
        #[arg(help = "Photo id")]
        id: Uuid,
    },

    #[command(about = "Delete a photo record")]
    Delete {
        #[arg(help = "Photo id")]
        id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_participants_add() {
        let args = Args::try_parse_from([
            "guest-photos",
            "participants",
            "add",
            "Jo Park",
            "--venue",
            "3",
            "--instagram",
            "@jo",
        ])
        .unwrap();

        match args.command {
            Commands::Participants {
                command:
                    ParticipantCommand::Add {
                        name,
                        venue,
                        instagram,
                    },
            } => {
                assert_eq!(name, "Jo Park");
                assert_eq!(venue, "3");
                assert_eq!(instagram.as_deref(), Some("@jo"));
            }
            _ => panic!("expected participants add"),
        }
    }

    #[test]
    fn test_parse_upload() {
        let args = Args::try_parse_from([
            "guest-photos",
            "upload",
            "a.jpg",
            "photos/",
            "--venue",
            "4",
            "-r",
            "-q",
            "0.7",
            "-f",
            "jpeg",
            "--dry-run",
        ])
        .unwrap();

        match args.command {
            Commands::Upload {
                inputs,
                venue,
                recursive,
                quality,
                format,
                dry_run,
                ..
            } => {
                assert_eq!(inputs, vec!["a.jpg", "photos/"]);
                assert_eq!(venue, "4");
                assert!(recursive);
                assert_eq!(quality, Some(0.7));
                assert_eq!(format, Some(OutputFormat::Jpeg));
                assert!(dry_run);
            }
            _ => panic!("expected upload command"),
        }
    }

    #[test]
    fn test_upload_requires_venue_and_inputs() {
        assert!(Args::try_parse_from(["guest-photos", "upload", "a.jpg"]).is_err());
        assert!(Args::try_parse_from(["guest-photos", "upload", "--venue", "1"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["guest-photos", "venues", "list", "--quiet", "-v"]).unwrap();
        assert!(args.quiet);
        assert!(args.verbose);
    }

    #[test]
    fn test_photo_id_must_be_uuid() {
        assert!(Args::try_parse_from(["guest-photos", "photos", "approve", "42"]).is_err());
    }
}
