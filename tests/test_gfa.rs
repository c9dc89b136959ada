use std::io::Write;

use tempfile::NamedTempFile;

use gfa2gbwt::error::GfaError;
use gfa2gbwt::gfa::GfaFile;

/// Helper to materialize GFA content in a temporary file.
fn write_gfa(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temporary GFA file");
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn preprocessing_counts_and_statistics() {
    let gfa = write_gfa(
        "H\tVN:Z:1.0\n\
         S\t1\tACGT\n\
         S\t2\tGTTTTA\n\
         L\t1\t+\t2\t+\t*\n\
         P\tx\t1+,2-\t*\n\
         W\tHG002\t1\tchr1\t0\t10\t>1>2\n\
         # free-form comment line\n",
    );
    let gfa = GfaFile::open(gfa.path(), false).unwrap();

    assert_eq!(gfa.segments(), 2);
    assert_eq!(gfa.links(), 1);
    assert_eq!(gfa.paths(), 1);
    assert_eq!(gfa.walks(), 1);
    assert_eq!(gfa.max_segment_length(), 6);
    assert_eq!(gfa.max_path_length(), 2);
    assert!(!gfa.requires_translation());
}

#[test]
fn named_segments_require_translation() {
    let gfa = write_gfa("S\tchr1\tAAA\nP\tp\tchr1+\t*\n");
    let gfa = GfaFile::open(gfa.path(), false).unwrap();
    assert!(gfa.requires_translation());
}

#[test]
fn zero_segment_id_requires_translation() {
    let gfa = write_gfa("S\t0\tAAA\nP\tp\t0+\t*\n");
    let gfa = GfaFile::open(gfa.path(), false).unwrap();
    assert!(gfa.requires_translation());
}

#[test]
fn missing_trailing_newline_is_accepted() {
    let gfa = write_gfa("S\t1\tAC\nP\tx\t1+\t*");
    let gfa = GfaFile::open(gfa.path(), false).unwrap();
    assert_eq!(gfa.segments(), 1);
    assert_eq!(gfa.paths(), 1);

    let mut paths = Vec::new();
    gfa.for_each_path(
        |name| {
            paths.push(name.to_string());
            true
        },
        |_, _| true,
        || true,
    );
    assert_eq!(paths, vec!["x"]);
}

#[test]
fn segment_iteration_in_source_order() {
    let gfa = write_gfa("S\t2\tGT\nS\t1\tAC\nP\tx\t2+,1+\t*\n");
    let gfa = GfaFile::open(gfa.path(), false).unwrap();

    let mut segments = Vec::new();
    gfa.for_each_segment(|name, sequence| {
        segments.push((name.to_string(), sequence.to_vec()));
        true
    });
    assert_eq!(
        segments,
        vec![
            ("2".to_string(), b"GT".to_vec()),
            ("1".to_string(), b"AC".to_vec()),
        ]
    );
}

#[test]
fn link_iteration() {
    let gfa = write_gfa(
        "S\t1\tAC\nS\t2\tGT\nL\t1\t+\t2\t-\t0M\nL\t2\t-\t1\t+\t*\nP\tx\t1+\t*\n",
    );
    let gfa = GfaFile::open(gfa.path(), false).unwrap();

    let mut links = Vec::new();
    gfa.for_each_link(|from, from_is_reverse, to, to_is_reverse| {
        links.push((
            from.to_string(),
            from_is_reverse,
            to.to_string(),
            to_is_reverse,
        ));
        true
    });
    assert_eq!(
        links,
        vec![
            ("1".to_string(), false, "2".to_string(), true),
            ("2".to_string(), true, "1".to_string(), false),
        ]
    );
}

#[test]
fn path_contents() {
    let gfa = write_gfa("S\t1\tAC\nS\t2\tGT\nP\tx\t1+,2-\t*\nP\ty\t2+\t*\n");
    let gfa = GfaFile::open(gfa.path(), false).unwrap();

    let mut names = Vec::new();
    let mut segments = Vec::new();
    let mut finished = 0;
    gfa.for_each_path(
        |name| {
            names.push(name.to_string());
            true
        },
        |name, is_reverse| {
            segments.push((name.to_string(), is_reverse));
            true
        },
        || {
            finished += 1;
            true
        },
    );
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(
        segments,
        vec![
            ("1".to_string(), false),
            ("2".to_string(), true),
            ("2".to_string(), false),
        ]
    );
    assert_eq!(finished, 2);
}

#[test]
fn walk_contents() {
    let gfa = write_gfa(
        "S\t1\tAC\nS\t2\tGT\nW\tHG002\t1\tchr1\t5\t9\t>1<2\nW\tHG002\t2\tchr1\t0\t2\t>2\n",
    );
    let gfa = GfaFile::open(gfa.path(), false).unwrap();

    let mut headers = Vec::new();
    let mut segments = Vec::new();
    let mut finished = 0;
    gfa.for_each_walk(
        |sample, haplotype, contig, start| {
            headers.push(format!("{}/{}/{}/{}", sample, haplotype, contig, start));
            true
        },
        |name, is_reverse| {
            segments.push((name.to_string(), is_reverse));
            true
        },
        || {
            finished += 1;
            true
        },
    );
    assert_eq!(headers, vec!["HG002/1/chr1/5", "HG002/2/chr1/0"]);
    assert_eq!(
        segments,
        vec![
            ("1".to_string(), false),
            ("2".to_string(), true),
            ("2".to_string(), false),
        ]
    );
    assert_eq!(finished, 2);
}

#[test]
fn callbacks_can_stop_iteration() {
    let gfa = write_gfa("S\t1\tAC\nS\t2\tGT\nS\t3\tTT\nP\tx\t1+\t*\n");
    let gfa = GfaFile::open(gfa.path(), false).unwrap();

    let mut seen = Vec::new();
    gfa.for_each_segment(|name, _| {
        seen.push(name.to_string());
        seen.len() < 2
    });
    assert_eq!(seen, vec!["1", "2"]);
}

#[test]
fn preprocessing_is_idempotent() {
    let content = "S\t1\tACGT\nS\tchr2\tGT\nL\t1\t+\tchr2\t+\t*\nP\tx\t1+,chr2-\t*\n";
    let file = write_gfa(content);
    let first = GfaFile::open(file.path(), false).unwrap();
    let second = GfaFile::open(file.path(), false).unwrap();

    assert_eq!(first.segments(), second.segments());
    assert_eq!(first.links(), second.links());
    assert_eq!(first.paths(), second.paths());
    assert_eq!(first.walks(), second.walks());
    assert_eq!(first.max_segment_length(), second.max_segment_length());
    assert_eq!(first.max_path_length(), second.max_path_length());
    assert_eq!(first.requires_translation(), second.requires_translation());

    let mut seen_first = Vec::new();
    first.for_each_segment(|name, sequence| {
        seen_first.push((name.to_string(), sequence.to_vec()));
        true
    });
    let mut seen_second = Vec::new();
    second.for_each_segment(|name, sequence| {
        seen_second.push((name.to_string(), sequence.to_vec()));
        true
    });
    assert_eq!(seen_first, seen_second);
}

#[test]
fn truncated_s_line_is_a_structure_error() {
    let gfa = write_gfa("S\t1\nP\tx\t1+\t*\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Structure { record, line, what }) => {
            assert_eq!(record, 'S');
            assert_eq!(line, 1);
            assert!(what.contains("ended after segment name"), "got: {}", what);
        }
        other => panic!("expected a structure error, got {:?}", other.err()),
    }
}

#[test]
fn empty_sequence_is_a_structure_error() {
    let gfa = write_gfa("S\t1\t\nP\tx\t1+\t*\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Structure { record, line, what }) => {
            assert_eq!(record, 'S');
            assert_eq!(line, 1);
            assert!(what.contains("has no sequence"), "got: {}", what);
        }
        other => panic!("expected a structure error, got {:?}", other.err()),
    }
}

#[test]
fn truncated_l_line_is_a_structure_error() {
    let gfa = write_gfa("S\t1\tAC\nS\t2\tGT\nL\t1\t+\t2\nP\tx\t1+\t*\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Structure { record, line, what }) => {
            assert_eq!(record, 'L');
            assert_eq!(line, 3);
            assert!(
                what.contains("ended after destination segment"),
                "got: {}",
                what
            );
        }
        other => panic!("expected a structure error, got {:?}", other.err()),
    }
}

#[test]
fn bad_destination_orientation_is_a_shape_error() {
    let gfa = write_gfa("S\t1\tAC\nS\t2\tGT\nL\t1\t+\t2\t?\t*\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Shape { record, line, what }) => {
            assert_eq!(record, 'L');
            assert_eq!(line, 3);
            assert!(what.contains("destination orientation"), "got: {}", what);
            assert!(what.contains('?'), "got: {}", what);
        }
        other => panic!("expected a shape error, got {:?}", other.err()),
    }
}

#[test]
fn empty_path_is_an_empty_collection_error() {
    let gfa = write_gfa("S\t1\tAC\nP\tp\t\t*\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::EmptyCollection { record, line }) => {
            assert_eq!(record, 'P');
            assert_eq!(line, 2);
        }
        other => panic!("expected an empty collection error, got {:?}", other.err()),
    }
}

#[test]
fn path_segment_without_orientation_is_a_shape_error() {
    let gfa = write_gfa("S\t1\tAC\nP\tp\t1+,2\t*\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Shape { record, line, what }) => {
            assert_eq!(record, 'P');
            assert_eq!(line, 2);
            assert!(what.contains("invalid path segment"), "got: {}", what);
        }
        other => panic!("expected a shape error, got {:?}", other.err()),
    }
}

#[test]
fn walk_without_segments_is_an_empty_collection_error() {
    // End position as the last field of the line.
    let gfa = write_gfa("S\t1\tAC\nW\tHG002\t1\tchr1\t0\t0\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::EmptyCollection { record, line }) => {
            assert_eq!(record, 'W');
            assert_eq!(line, 2);
        }
        other => panic!("expected an empty collection error, got {:?}", other.err()),
    }

    // Empty walk list after the end position.
    let gfa = write_gfa("S\t1\tAC\nW\tHG002\t1\tchr1\t0\t0\t\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::EmptyCollection { record, line }) => {
            assert_eq!(record, 'W');
            assert_eq!(line, 2);
        }
        other => panic!("expected an empty collection error, got {:?}", other.err()),
    }
}

#[test]
fn bad_walk_segment_is_a_shape_error() {
    let gfa = write_gfa("S\t1\tAC\nW\tHG002\t1\tchr1\t0\t2\t>1x2\t*\n");
    // ">1x2" is a single valid walk segment named "1x2"; an actual shape
    // error needs a list element that does not start with an orientation.
    assert!(GfaFile::open(gfa.path(), false).is_ok());

    let gfa = write_gfa("S\t1\tAC\nW\tHG002\t1\tchr1\t0\t2\t1>2\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Shape { record, line, what }) => {
            assert_eq!(record, 'W');
            assert_eq!(line, 2);
            assert!(what.contains("invalid walk segment"), "got: {}", what);
        }
        other => panic!("expected a shape error, got {:?}", other.err()),
    }
}

#[test]
fn truncated_w_line_is_a_structure_error() {
    let gfa = write_gfa("S\t1\tAC\nW\tHG002\t1\tchr1\t0\n");
    match GfaFile::open(gfa.path(), false) {
        Err(GfaError::Structure { record, line, what }) => {
            assert_eq!(record, 'W');
            assert_eq!(line, 2);
            assert!(what.contains("ended after start position"), "got: {}", what);
        }
        other => panic!("expected a structure error, got {:?}", other.err()),
    }
}

#[test]
fn unknown_records_are_skipped() {
    let gfa = write_gfa(
        "H\tVN:Z:1.0\nX\tsomething\t\t\nS\t1\tAC\nC\tcontainment\nP\tx\t1+\t*\n\n",
    );
    let gfa = GfaFile::open(gfa.path(), false).unwrap();
    assert_eq!(gfa.segments(), 1);
    assert_eq!(gfa.paths(), 1);
    assert_eq!(gfa.links(), 0);
    assert_eq!(gfa.walks(), 0);
}
