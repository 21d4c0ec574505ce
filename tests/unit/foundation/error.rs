use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        StitchError::EmptyTimeline
            .to_string()
            .contains("empty timeline")
    );
    assert!(
        StitchError::load("c1", "no metadata")
            .to_string()
            .contains("load error on clip 'c1'")
    );
    assert!(
        StitchError::seek("c2", 1.5, "eof")
            .to_string()
            .contains("at 1.500s")
    );
    assert!(
        StitchError::encoding_unsupported("x")
            .to_string()
            .contains("encoding unsupported:")
    );
    assert!(
        StitchError::mix_graph("x")
            .to_string()
            .contains("mix graph error:")
    );
    assert!(
        StitchError::invalid_trim("c3", "x")
            .to_string()
            .contains("invalid trim on clip 'c3'")
    );
    assert!(
        StitchError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = StitchError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
