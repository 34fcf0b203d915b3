//! Writing consolidated locations to disk.

use colegio_geo::{Location, Table, consolidate, write_locations};

#[test]
fn writes_consolidated_file_under_new_directory() {
    let dir = std::env::temp_dir().join(format!("colegio-geo-{}", std::process::id()));
    let path = dir.join("data").join("ubicaciones.csv");

    let provinces = Table::parse("Código,Nombre\n3,Cartago\n").unwrap();
    let cantons = Table::parse("Código,Nombre,Provincia\n302,Paraíso,3\n").unwrap();
    let districts = Table::parse("Código,Nombre,Cantón\n30203,Orosi,302\n").unwrap();

    let rows = consolidate(&provinces, &cantons, &districts).unwrap();
    assert_eq!(
        rows,
        vec![Location {
            province: "Cartago".into(),
            canton: "Paraíso".into(),
            district: "Orosi".into(),
        }]
    );

    write_locations(&path, &rows).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "provincia,canton,distrito\nCartago,Paraíso,Orosi\n");

    std::fs::remove_dir_all(&dir).unwrap();
}
