use portcheck_rs::ports::{parse_ports_spec, parse_ports_str};

#[test]
fn parse_single_and_ranges_and_comments() {
    let input = r#"
        # common ports
        22
        80  # http
        443 # https
        8000-8002
        8001  # duplicate
        # blank line follows

    "#;

    let ports = parse_ports_str(input).expect("parse ok");
    // Dedup, preserve insertion order of first appearance in each range/line
    assert_eq!(ports, vec![22, 80, 443, 8000, 8001, 8002]);
}

#[test]
fn command_line_spec_matches_file_syntax() {
    let from_spec = parse_ports_spec("22,53,30000-30003").expect("parse ok");
    let from_file = parse_ports_str("22\n53\n30000-30003\n").expect("parse ok");
    assert_eq!(from_spec, from_file);
    assert_eq!(from_spec, vec![22, 53, 30000, 30001, 30002, 30003]);
}

#[test]
fn invalid_port_rejected() {
    assert!(parse_ports_str("0\n").is_err());
    assert!(parse_ports_spec("22,65536").is_err());
    assert!(parse_ports_spec("10-").is_err());
}
