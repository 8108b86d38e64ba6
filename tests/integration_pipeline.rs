//! Integration tests for the extraction pipeline
//!
//! These tests write real (uncompressed) PDFs with lopdf, laid out like the
//! official results books, and run each layout end to end from PDF to CSV.

use gymscore::models::ResultFormat;
use gymscore::processor::ScoreProcessor;
use gymscore::{CoercionPolicy, GymScoreError, ParserConfig};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FONT_SIZE: i64 = 8;

/// A string placed with its left edge at `(x, y)`
struct Placed {
    x: i64,
    y: i64,
    text: String,
}

fn at(x: i64, y: i64, text: &str) -> Placed {
    Placed {
        x,
        y,
        text: text.to_string(),
    }
}

/// A string whose estimated right edge (half an em per glyph) sits at `right`
fn right_at(right: i64, y: i64, text: &str) -> Placed {
    let width = text.chars().count() as i64 * FONT_SIZE / 2;
    at(right - width, y, text)
}

/// How the test PDFs encode their text
#[derive(Debug, Clone, Copy)]
enum FontKind {
    /// Standard Helvetica with WinAnsi single-byte strings
    Helvetica,
    /// Subset TrueType as Type0/Identity-H, glyph ids mapped back by ToUnicode
    Subset,
}

/// Glyph ids of the subset font sit 29 below the character codes
const SUBSET_CMAP: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0003> <00E2> <0020>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

fn add_font(doc: &mut Document, kind: FontKind) -> lopdf::ObjectId {
    match kind {
        FontKind::Helvetica => doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }),
        FontKind::Subset => {
            let cmap_id =
                doc.add_object(Stream::new(dictionary! {}, SUBSET_CMAP.as_bytes().to_vec()));
            let descendant_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "CIDFontType2",
                "BaseFont" => "GYMSUB+Arial",
                "CIDSystemInfo" => dictionary! {
                    "Registry" => Object::string_literal("Adobe"),
                    "Ordering" => Object::string_literal("Identity"),
                    "Supplement" => Object::Integer(0),
                },
                "DW" => Object::Integer(500),
            });
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => "GYMSUB+Arial",
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Reference(descendant_id)],
                "ToUnicode" => cmap_id,
            })
        }
    }
}

fn encode(kind: FontKind, text: &str) -> Object {
    match kind {
        FontKind::Helvetica => Object::string_literal(text),
        FontKind::Subset => Object::String(
            text.chars()
                .flat_map(|ch| (ch as u16 - 29).to_be_bytes())
                .collect(),
            StringFormat::Hexadecimal,
        ),
    }
}

/// Write a Helvetica PDF with one page per entry of `pages`
fn write_pdf(path: &Path, pages: &[Vec<Placed>]) {
    write_pdf_with_font(path, pages, FontKind::Helvetica);
}

fn write_pdf_with_font(path: &Path, pages: &[Vec<Placed>], kind: FontKind) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = add_font(&mut doc, kind);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for cells in pages {
        let mut operations = Vec::new();
        for cell in cells {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(FONT_SIZE)],
                ),
                Operation::new("Td", vec![Object::Integer(cell.x), Object::Integer(cell.y)]),
                Operation::new("Tj", vec![encode(kind, &cell.text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(count),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn run(
    format: ResultFormat,
    pdf: &Path,
    output: &Path,
) -> gymscore::Result<gymscore::ProcessingStats> {
    ScoreProcessor::new(format, pdf.to_path_buf(), output.to_path_buf()).process()
}

fn csv_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Apparatus final
// =============================================================================

const EVENT_COLUMNS: [i64; 8] = [40, 70, 110, 260, 320, 370, 420, 470];

const BEAM_FINAL: [[&str; 8]; 8] = [
    ["1", "305", "ZHOU Yaqin", "CHN", "6.400", "8.300", "", "14.700"],
    ["2", "306", "ZHANG Qingying", "CHN", "6.200", "8.166", "", "14.366"],
    ["3", "201", "D'AMATO Alice", "ITA", "6.000", "8.200", "", "14.200"],
    ["4", "101", "ANDRADE Rebeca", "BRA", "5.900", "8.233", "-0.100", "14.033"],
    ["5", "140", "KISHI Rina", "JPN", "5.500", "8.366", "", "13.866"],
    ["6", "112", "BILES Simone", "USA", "5.800", "8.033", "", "13.833"],
    ["7", "202", "ESPOSITO Manila", "ITA", "5.700", "8.100", "", "13.800"],
    ["8", "110", "CHILES Jordan", "USA", "5.400", "8.233", "-0.300", "13.333"],
];

fn beam_final_page() -> Vec<Placed> {
    let mut cells = vec![
        at(40, 800, "Artistic Gymnastics"),
        at(40, 780, "Women's Balance Beam Final"),
    ];
    for (label, x) in ["Rank", "Bib", "Name", "NOC", "D", "E", "Pen.", "Total"]
        .iter()
        .zip(EVENT_COLUMNS)
    {
        cells.push(at(x, 700, label));
    }
    for (index, row) in BEAM_FINAL.iter().enumerate() {
        let y = 680 - 20 * index as i64;
        for (value, x) in row.iter().zip(EVENT_COLUMNS) {
            if !value.is_empty() {
                cells.push(at(x, y, value));
            }
        }
    }
    cells.push(at(40, 60, "Legend: DNS Did not start"));
    cells
}

#[test]
fn test_balance_beam_final_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("WAG_BB_final.pdf");
    let output = temp_dir.path().join("WAG_BB_final.csv");
    write_pdf(&pdf, &[beam_final_page()]);

    let stats = run(ResultFormat::EventFinals, &pdf, &output).unwrap();
    assert_eq!(stats.pages_read, 1);
    assert_eq!(stats.records_written, 8);
    assert_eq!(stats.records_penalised, 2);
    assert_eq!(stats.records_mismatched, 0);

    let lines = csv_lines(&output);
    assert_eq!(lines.len(), 9);
    assert_eq!(
        lines[0],
        "gymnast_name,country,apparatus,d_score,e_score,total_score,rank,bib,penalty,attempt,score_check"
    );
    assert_eq!(lines[1], "ZHOU Yaqin,CHN,BB,6.400,8.300,14.700,1,305,,,ok");
    assert_eq!(lines[4], "ANDRADE Rebeca,BRA,BB,5.900,8.233,14.033,4,101,-0.100,,penalty");
    assert_eq!(lines[8], "CHILES Jordan,USA,BB,5.400,8.233,13.333,8,110,-0.300,,penalty");
    assert!(lines[1..].iter().all(|line| line.contains(",BB,")));
}

#[test]
fn test_subset_font_final_matches_helvetica() {
    let temp_dir = TempDir::new().unwrap();
    let helvetica_pdf = temp_dir.path().join("helvetica.pdf");
    let subset_pdf = temp_dir.path().join("subset.pdf");
    write_pdf(&helvetica_pdf, &[beam_final_page()]);
    write_pdf_with_font(&subset_pdf, &[beam_final_page()], FontKind::Subset);

    let helvetica_csv = temp_dir.path().join("helvetica.csv");
    let subset_csv = temp_dir.path().join("subset.csv");
    run(ResultFormat::EventFinals, &helvetica_pdf, &helvetica_csv).unwrap();
    let stats = run(ResultFormat::EventFinals, &subset_pdf, &subset_csv).unwrap();

    assert_eq!(stats.records_written, 8);
    let lines = csv_lines(&subset_csv);
    assert_eq!(lines[1], "ZHOU Yaqin,CHN,BB,6.400,8.300,14.700,1,305,,,ok");
    assert_eq!(lines[3], "D'AMATO Alice,ITA,BB,6.000,8.200,14.200,3,201,,,ok");
    assert_eq!(lines, csv_lines(&helvetica_csv));
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("beam.pdf");
    write_pdf(&pdf, &[beam_final_page()]);

    let first = temp_dir.path().join("first.csv");
    let second = temp_dir.path().join("second.csv");
    run(ResultFormat::EventFinals, &pdf, &first).unwrap();
    run(ResultFormat::EventFinals, &pdf, &second).unwrap();

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_apparatus_names_style() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("beam.pdf");
    let output = temp_dir.path().join("beam.csv");
    write_pdf(&pdf, &[beam_final_page()]);

    let config = ParserConfig::default().with_apparatus_style(gymscore::ApparatusStyle::Name);
    ScoreProcessor::new(ResultFormat::EventFinals, pdf, output.clone())
        .with_config(config)
        .process()
        .unwrap();

    assert!(csv_lines(&output)[1].starts_with("ZHOU Yaqin,CHN,Balance Beam,"));
}

// =============================================================================
// Team final
// =============================================================================

const APPARATUS_RIGHT: [i64; 4] = [260, 360, 460, 560];

fn team_header(y: i64, rank: &str, team: &str, totals: [&str; 4], total: &str) -> Vec<Placed> {
    let mut cells = vec![at(40, y, rank), at(60, y, team)];
    for (index, (value, right)) in totals.iter().zip(APPARATUS_RIGHT).enumerate() {
        cells.push(right_at(right, y, value));
        cells.push(at(right + 4, y, &format!("({})", index + 1)));
    }
    cells.push(at(600, y, total));
    cells
}

type Routine<'a> = Option<(&'a str, &'a str, &'a str, &'a str)>;

fn team_gymnast(y: i64, bib: &str, name: &str, routines: [Routine; 4]) -> Vec<Placed> {
    let mut cells = vec![at(40, y, bib), at(60, y, name), at(150, y, "D"), at(160, y, "E")];
    for (routine, right) in routines.iter().zip(APPARATUS_RIGHT) {
        let Some((d, score, e, pen)) = routine else {
            continue;
        };
        cells.push(at(right - 60, y, d));
        cells.push(right_at(right, y, score));
        cells.push(at(right - 60, y - 8, e));
        if !pen.is_empty() {
            cells.push(right_at(right, y - 8, pen));
        }
    }
    cells
}

fn team_final_pages() -> Vec<Vec<Placed>> {
    let mut first = vec![at(40, 780, "Women's Team Final")];
    first.extend(team_header(
        700,
        "1",
        "USA - United States",
        ["43.833", "42.165", "41.032", "40.699"],
        "167.729",
    ));
    first.extend(team_gymnast(
        680,
        "112",
        "BILES Simone",
        [
            Some(("6.400", "15.766", "9.366", "")),
            Some(("6.300", "14.433", "8.133", "")),
            Some(("6.600", "14.366", "7.766", "")),
            Some(("6.700", "14.666", "8.066", "-0.100")),
        ],
    ));
    first.extend(team_gymnast(
        650,
        "110",
        "CHILES Jordan",
        [
            None,
            Some(("5.800", "14.000", "8.200", "")),
            None,
            Some(("5.400", "13.333", "8.233", "-0.300")),
        ],
    ));

    let mut second = team_header(
        700,
        "2",
        "ITA - Italy",
        ["41.500", "40.100", "40.466", "39.900"],
        "161.966",
    );
    second.extend(team_gymnast(
        680,
        "201",
        "D'AMATO Alice",
        [Some(("5.000", "13.900", "8.900", "")), None, None, None],
    ));

    vec![first, second]
}

#[test]
fn test_team_final_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("WAG_team_final.pdf");
    let output = temp_dir.path().join("team.csv");
    write_pdf(&pdf, &team_final_pages());

    let stats = run(ResultFormat::TeamAllAround, &pdf, &output).unwrap();
    assert_eq!(stats.pages_read, 2);
    assert_eq!(stats.records_written, 7);
    assert_eq!(stats.aggregates_excluded, 2);

    let lines = csv_lines(&output);
    assert_eq!(
        lines[0],
        "gymnast_name,country,apparatus,d_score,e_score,total_score,team,team_rank,bib,penalty,score_check"
    );
    assert_eq!(lines[1], "BILES Simone,USA,VT,6.400,9.366,15.766,United States,1,112,,ok");
    assert_eq!(
        lines[4],
        "BILES Simone,USA,FX,6.700,8.066,14.666,United States,1,112,-0.100,penalty"
    );
    assert_eq!(lines[7], "D'AMATO Alice,ITA,VT,5.000,8.900,13.900,Italy,2,201,,ok");
}

// =============================================================================
// Individual all-around final
// =============================================================================

const ALL_AROUND_X: [i64; 4] = [200, 300, 400, 500];

struct AllAroundEntry<'a> {
    identity: [&'a str; 4],
    results: [(&'a str, &'a str, &'a str); 4],
    total: &'a str,
    executions: [(&'a str, &'a str); 4],
}

const ALL_AROUND: [AllAroundEntry<'static>; 2] = [
    AllAroundEntry {
        identity: ["1", "123", "BILES Simone", "USA"],
        results: [
            ("6.400", "15.766", "1"),
            ("5.800", "14.000", "5"),
            ("6.600", "14.366", "2"),
            ("6.000", "13.533", "4"),
        ],
        total: "57.665",
        executions: [("9.366", ""), ("8.200", ""), ("7.766", ""), ("7.633", "-0.100")],
    },
    AllAroundEntry {
        identity: ["2", "101", "ANDRADE Rebeca", "BRA"],
        results: [
            ("5.600", "15.100", "2"),
            ("5.900", "14.200", "3"),
            ("5.900", "14.066", "4"),
            ("5.700", "13.900", "3"),
        ],
        total: "57.266",
        executions: [("9.500", ""), ("8.300", ""), ("8.166", ""), ("8.200", "")],
    },
];

fn all_around_page() -> Vec<Placed> {
    let mut cells = vec![at(40, 780, "Women's All-Around Final")];
    for (label, x) in ["Vault", "Uneven Bars", "Balance Beam", "Floor Exercise"]
        .iter()
        .zip(ALL_AROUND_X)
    {
        cells.push(at(x, 720, label));
    }

    for (index, entry) in ALL_AROUND.iter().enumerate() {
        let y = 700 - 40 * index as i64;
        for ((d, score, rank), x) in entry.results.iter().zip(ALL_AROUND_X) {
            cells.push(at(x, y, d));
            cells.push(at(x + 24, y, score));
            cells.push(at(x + 52, y, &format!("({})", rank)));
        }
        cells.push(at(600, y, entry.total));

        let [rank, bib, name, noc] = entry.identity;
        cells.extend([
            at(40, y - 10, rank),
            at(60, y - 10, bib),
            at(90, y - 10, name),
            at(160, y - 10, noc),
            at(180, y - 10, "D"),
            at(190, y - 10, "E"),
        ]);

        for ((e, pen), x) in entry.executions.iter().zip(ALL_AROUND_X) {
            cells.push(at(x, y - 20, e));
            if !pen.is_empty() {
                cells.push(at(x + 24, y - 20, pen));
            }
        }
    }
    cells
}

#[test]
fn test_all_around_final_to_csv() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("WAG_AA_final.pdf");
    let output = temp_dir.path().join("aa.csv");
    write_pdf(&pdf, &[all_around_page()]);

    let stats = run(ResultFormat::IndividualAllAround, &pdf, &output).unwrap();
    assert_eq!(stats.records_written, 8);

    let lines = csv_lines(&output);
    assert_eq!(
        lines[0],
        "gymnast_name,country,apparatus,d_score,e_score,total_score,all_around_rank,bib,apparatus_rank,penalty,all_around_total,score_check"
    );
    assert_eq!(lines[1], "BILES Simone,USA,VT,6.400,9.366,15.766,1,123,1,,57.665,ok");

    let apparatus: Vec<&str> = lines[1..]
        .iter()
        .map(|line| line.split(',').nth(2).unwrap())
        .collect();
    assert_eq!(apparatus, ["VT", "UB", "BB", "FX", "VT", "UB", "BB", "FX"]);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_missing_pdf_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out.csv");

    let result = run(
        ResultFormat::EventFinals,
        &temp_dir.path().join("missing.pdf"),
        &output,
    );
    assert!(matches!(result, Err(GymScoreError::Io { .. })));
    assert!(!output.exists());
}

#[test]
fn test_not_a_pdf_is_pdf_error() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("notes.pdf");
    std::fs::write(&pdf, "start list, not a results book").unwrap();

    let result = run(ResultFormat::EventFinals, &pdf, &temp_dir.path().join("out.csv"));
    match result {
        Err(GymScoreError::Pdf { path, .. }) => assert_eq!(path, pdf),
        other => panic!("Expected Pdf error, got {:?}", other),
    }
}

#[test]
fn test_pdf_without_table_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("cover.pdf");
    let output: PathBuf = temp_dir.path().join("cover.csv");
    let cover = vec![at(40, 780, "Official Results Book"), at(40, 760, "Artistic Gymnastics")];
    write_pdf(&pdf, &[cover]);

    for format in [
        ResultFormat::EventFinals,
        ResultFormat::TeamAllAround,
        ResultFormat::IndividualAllAround,
    ] {
        let result = run(format, &pdf, &output);
        assert!(
            matches!(result, Err(GymScoreError::MalformedInput { .. })),
            "{:?} should reject a PDF without a score table",
            format
        );
        assert!(!output.exists());
    }
}

#[test]
fn test_abort_policy_fails_whole_run() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = temp_dir.path().join("beam.pdf");
    let output = temp_dir.path().join("beam.csv");

    let mut page = beam_final_page();
    for cell in page.iter_mut() {
        if cell.text == "8.366" {
            cell.text = "8.3G6".to_string();
        }
    }
    write_pdf(&pdf, &[page]);

    let config = ParserConfig::default().with_coercion_policy(CoercionPolicy::Abort);
    let result = ScoreProcessor::new(ResultFormat::EventFinals, pdf, output.clone())
        .with_config(config)
        .process();

    assert!(matches!(result, Err(GymScoreError::FieldCoercion { .. })));
    assert!(!output.exists());
}
