use std::io::Write;

use tempfile::NamedTempFile;

use gfa2gbwt::builder::{encode_node, GbwtBuilder};
use gfa2gbwt::convert::{self, GfaParsingParameters};
use gfa2gbwt::{emit, serialize, SequenceStore};

/// Helper to materialize GFA content in a temporary file.
fn write_gfa(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temporary GFA file");
    write!(file, "{}", content).unwrap();
    file
}

fn emit_to_string(
    store: &SequenceStore,
    index: &gfa2gbwt::GbwtIndex,
) -> String {
    let mut buffer = Vec::new();
    emit::gbwt_to_gfa(store, index, &mut buffer, false).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[test]
fn direct_graph_with_paths_emits_walks() {
    let gfa = write_gfa("S\t1\tAC\nS\t2\tGT\nP\tx\t1+,2+\t*\n");
    let (store, index) =
        convert::gfa_to_gbwt(gfa.path(), &GfaParsingParameters::default()).unwrap();

    // With the default expression the path name becomes the sample name and
    // there is no reference sample, so the path comes back as a walk whose
    // end position is the total sequence length.
    let output = emit_to_string(&store, &index);
    assert_eq!(
        output,
        "H\tVN:Z:1.0\nS\t1\tAC\nS\t2\tGT\nW\tx\t0\t0\t0\t4\t>1>2\n"
    );
}

#[test]
fn reference_paths_and_walks_are_emitted_as_p_and_w_lines() {
    let gfa = write_gfa(
        "S\ts1\tACGT\nS\ts2\tTTAGA\n\
         P\tGRCh38#chr1\ts1+,s2-\t*\n\
         W\tHG002\t1\tchr1\t5\t14\t>s1>s2\n",
    );
    let parameters = GfaParsingParameters {
        max_node_length: 3,
        ..Default::default()
    };
    let (store, index) = convert::gfa_to_gbwt(gfa.path(), &parameters).unwrap();

    let output = emit_to_string(&store, &index);
    assert_eq!(
        output,
        "H\tVN:Z:1.0\n\
         S\ts1\tACGT\n\
         S\ts2\tTTAGA\n\
         P\tGRCh38#chr1\ts1+,s2-\t*\n\
         W\tHG002\t1\tchr1\t5\t14\t>s1>s2\n"
    );
}

#[test]
fn round_trip_preserves_ingest_outputs() {
    let gfa = write_gfa(
        "S\ts1\tACGT\nS\ts2\tTTAGA\n\
         P\tGRCh38#chr1\ts1+,s2-\t*\n\
         W\tHG002\t1\tchr1\t5\t14\t>s1>s2\n\
         W\tHG002\t2\tchr1\t0\t9\t<s2<s1\n",
    );
    let parameters = GfaParsingParameters {
        max_node_length: 3,
        ..Default::default()
    };
    let (store, index) = convert::gfa_to_gbwt(gfa.path(), &parameters).unwrap();

    let output = emit_to_string(&store, &index);
    let reingested = write_gfa(&output);
    let (store2, index2) = convert::gfa_to_gbwt(reingested.path(), &parameters).unwrap();

    assert_eq!(store, store2);
    assert_eq!(index, index2);

    // Emitting again reproduces the same bytes.
    assert_eq!(output, emit_to_string(&store2, &index2));
}

#[test]
fn index_without_metadata_emits_numbered_paths() {
    let mut store = SequenceStore::new();
    store.add_node(1, b"AC");
    store.add_node(2, b"GT");

    let mut builder = GbwtBuilder::new(GbwtBuilder::WORD_BITS, 1000, GbwtBuilder::SAMPLE_INTERVAL);
    builder.insert(&[encode_node(1, false), encode_node(2, false)], true);
    builder.insert(&[encode_node(2, true)], true);
    let index = builder.finish();

    let output = emit_to_string(&store, &index);
    assert_eq!(
        output,
        "H\tVN:Z:1.0\nS\t1\tAC\nS\t2\tGT\nP\t0\t1+,2+\t*\nP\t1\t2-\t\n"
    );
}

#[test]
fn reverse_traversal_of_split_segments_is_reassembled() {
    let gfa = write_gfa("S\tlong\tAAAAA\nS\tshort\tGG\nP\tp\tlong-,short+\t*\n");
    let parameters = GfaParsingParameters {
        max_node_length: 2,
        ..Default::default()
    };
    let (store, index) = convert::gfa_to_gbwt(gfa.path(), &parameters).unwrap();

    let output = emit_to_string(&store, &index);
    assert_eq!(
        output,
        "H\tVN:Z:1.0\nS\tlong\tAAAAA\nS\tshort\tGG\nW\tp\t0\t0\t0\t7\t<long>short\n"
    );
}

#[test]
fn serialization_round_trip() {
    let gfa = write_gfa(
        "S\ts1\tACGT\nS\ts2\tTT\n\
         P\tGRCh38#chr1\ts1+\t*\n\
         W\tHG002\t1\tchr1\t0\t6\t>s1>s2\n",
    );
    let (store, index) =
        convert::gfa_to_gbwt(gfa.path(), &GfaParsingParameters::default()).unwrap();

    let file = NamedTempFile::new().unwrap();
    serialize::save(file.path(), &store, &index).unwrap();
    let (loaded_store, loaded_index) = serialize::load(file.path()).unwrap();

    assert_eq!(store, loaded_store);
    assert_eq!(index, loaded_index);

    // The reloaded pair emits the same GFA.
    assert_eq!(
        emit_to_string(&store, &index),
        emit_to_string(&loaded_store, &loaded_index)
    );
}

#[test]
fn serialization_rejects_other_files() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "definitely not an index").unwrap();
    assert!(serialize::load(file.path()).is_err());
}
