//! Legacy TED v2 dialect parser (R2.0.7, R2.0.8, R2.0.9, 2008-2023).
//!
//! All three revisions share one namespace, captured once from the root
//! element, and differ only in where a handful of fields live — R2.0.9
//! nests everything under `F03_2014`, R2.0.7/R2.0.8 keep a flatter shape.
//! The variant is detected once per document and threaded through instead
//! of re-probing structure per field.

use chrono::NaiveDate;
use roxmltree::Node;

use ted_core::error::Result;
use ted_core::{
    normalize_authority_type, normalize_contract_nature, normalize_procedure_type,
};
use ted_core::{parse_optional_int, CodelistEntry, Identifier, Organization};
use ted_core::{Award, Contract, Document, Notice};

use crate::monetary_value;
use crate::xml::{attr, default_namespace, element_text, find, find_all, find_child, text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    R207R208,
    R209,
}

fn detect_variant(root: Node) -> Variant {
    let schema_location = attr(Some(root), "schemaLocation").unwrap_or("");
    if schema_location.contains("R2.0.9") {
        return Variant::R209;
    }
    if schema_location.contains("R2.0.7") || schema_location.contains("R2.0.8") {
        return Variant::R207R208;
    }
    if find(root, "F03_2014", None).is_some() {
        return Variant::R209;
    }
    Variant::R207R208
}

/// Parses one legacy TED v2 notice. Returns `Ok(None)` for structurally
/// incomplete documents (missing edition, publication date, buyer, contract,
/// or awards) rather than erroring: archives routinely carry deletion
/// notices and other non-award documents alongside award notices.
pub fn parse(root: Node, fallback_doc_id: &str) -> Result<Option<Notice>> {
    let variant = detect_variant(root);
    let ns = default_namespace(root);

    let Some(document) = extract_document(root, ns, fallback_doc_id, variant) else {
        return Ok(None);
    };
    let Some((buyer, contact)) = extract_buyer(root, ns, variant) else {
        return Ok(None);
    };
    let document = apply_contact_fields(document, contact);

    let Some(contract) = extract_contract(root, ns, variant) else {
        return Ok(None);
    };

    let awards = extract_awards(root, ns, variant);
    if awards.is_empty() {
        return Ok(None);
    }

    Ok(Some(Notice {
        document,
        buyer,
        contract,
        awards,
    }))
}

fn parse_date_yyyymmdd(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[4..6].parse().ok()?;
    let day: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn extract_document(root: Node, ns: Option<&str>, fallback_doc_id: &str, variant: Variant) -> Option<Document> {
    let doc_id = attr(Some(root), "DOC_ID")
        .map(str::to_string)
        .unwrap_or_else(|| fallback_doc_id.replace('_', "-"));
    let edition = attr(Some(root), "EDITION")?.to_string();

    let pub_date_text = text(find(root, "DATE_PUB", ns))?;
    let publication_date = parse_date_yyyymmdd(&pub_date_text)?;

    let dispatch_date = text(find(root, "DS_DATE_DISPATCH", ns)).and_then(|s| parse_date_yyyymmdd(&s));

    Some(Document {
        doc_id,
        edition: Some(edition),
        version: Some(match variant {
            Variant::R209 => "R2.0.9".to_string(),
            Variant::R207R208 => "R2.0.7/R2.0.8".to_string(),
        }),
        reception_id: text(find(root, "RECEPTION_ID", ns)),
        official_journal_ref: text(find(root, "NO_DOC_OJS", ns)),
        publication_date: Some(publication_date),
        dispatch_date,
        source_country: attr(find(root, "ISO_COUNTRY", ns), "VALUE").map(str::to_string),
        ..Default::default()
    })
}

struct ContactFields {
    contact_point: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    url_general: Option<String>,
    buyer_url: Option<String>,
    buyer_authority_type: Option<CodelistEntry>,
    buyer_main_activity_code: Option<String>,
}

fn apply_contact_fields(mut document: Document, contact: ContactFields) -> Document {
    document.contact_point = contact.contact_point;
    document.phone = contact.phone;
    document.email = contact.email;
    document.url_general = contact.url_general;
    document.buyer_url = contact.buyer_url;
    document.buyer_authority_type = contact.buyer_authority_type;
    document.buyer_main_activity_code = contact.buyer_main_activity_code;
    document
}

fn extract_buyer(root: Node, ns: Option<&str>, variant: Variant) -> Option<(Organization, ContactFields)> {
    match variant {
        Variant::R209 => extract_buyer_r209(root, ns),
        Variant::R207R208 => extract_buyer_r207(root, ns),
    }
}

fn extract_buyer_r207(root: Node, ns: Option<&str>) -> Option<(Organization, ContactFields)> {
    let ca = find(root, "CA_CE_CONCESSIONAIRE_PROFILE", ns)?;

    let org_elem = find(ca, "ORGANISATION", ns);
    let official_name = org_elem
        .and_then(|o| text(find_child(o, "OFFICIALNAME", ns)).or_else(|| text(Some(o))))
        .unwrap_or_default();

    let identifiers = org_elem
        .and_then(|o| text(find(o, "NATIONALID", ns)))
        .map(|id| vec![Identifier { scheme: None, value: id }])
        .unwrap_or_default();

    let authority_type_elem = find(root, "AA_AUTHORITY_TYPE", ns);
    let activity_elem = find(root, "MA_MAIN_ACTIVITIES", ns);

    let contact = ContactFields {
        contact_point: None,
        phone: text(find(ca, "PHONE", ns)),
        email: text(find(ca, "E_MAIL", ns)),
        url_general: text(find(root, "URL_GENERAL", ns)),
        buyer_url: text(find(root, "URL_BUYER", ns)),
        buyer_authority_type: normalize_authority_type(attr(authority_type_elem, "CODE")),
        buyer_main_activity_code: attr(activity_elem, "CODE").map(str::to_string),
    };

    let org = Organization {
        official_name,
        address: text(find(ca, "ADDRESS", ns)),
        town: text(find(ca, "TOWN", ns)),
        postal_code: text(find(ca, "POSTAL_CODE", ns)),
        country_code: attr(find(ca, "COUNTRY", ns), "VALUE").map(str::to_string),
        nuts_code: None,
        identifiers,
    };

    Some((org, contact))
}

fn extract_buyer_r209(root: Node, ns: Option<&str>) -> Option<(Organization, ContactFields)> {
    let f03 = find(root, "F03_2014", ns)?;
    let ca = find(f03, "CONTRACTING_BODY", ns)?;
    let addr_cb = find(ca, "ADDRESS_CONTRACTING_BODY", ns);

    let nuts_code = addr_cb.and_then(|a| find(a, "NUTS", None)).and_then(|n| attr(Some(n), "CODE")).map(str::to_string);

    let identifiers = addr_cb
        .and_then(|a| text(find(a, "NATIONALID", ns)))
        .map(|id| vec![Identifier { scheme: None, value: id }])
        .unwrap_or_default();

    let contact = ContactFields {
        contact_point: text(find(ca, "CONTACT_POINT", ns)),
        phone: text(find(ca, "PHONE", ns)),
        email: text(find(ca, "E_MAIL", ns)),
        url_general: text(find(ca, "URL_GENERAL", ns)),
        buyer_url: text(find(ca, "URL_BUYER", ns)),
        buyer_authority_type: normalize_authority_type(attr(find(ca, "CA_TYPE", ns), "VALUE")),
        buyer_main_activity_code: attr(find(ca, "CA_ACTIVITY", ns), "VALUE").map(str::to_string),
    };

    let org = Organization {
        official_name: text(find(ca, "OFFICIALNAME", ns)).unwrap_or_default(),
        address: text(find(ca, "ADDRESS", ns)),
        town: text(find(ca, "TOWN", ns)),
        postal_code: text(find(ca, "POSTAL_CODE", ns)),
        country_code: attr(find(ca, "COUNTRY", ns), "VALUE").map(str::to_string),
        nuts_code,
        identifiers,
    };

    Some((org, contact))
}

fn cpv_description_map(root: Node, ns: Option<&str>) -> Vec<(String, String)> {
    find_all(root, "ORIGINAL_CPV", ns)
        .into_iter()
        .filter_map(|elem| {
            let code = attr(Some(elem), "CODE")?.to_string();
            let desc = text(Some(elem))?;
            Some((code, desc))
        })
        .collect()
}

fn lookup_cpv_description(map: &[(String, String)], code: &str) -> Option<String> {
    map.iter().find(|(c, _)| c == code).map(|(_, d)| d.clone())
}

fn extract_contract(root: Node, ns: Option<&str>, variant: Variant) -> Option<Contract> {
    match variant {
        Variant::R209 => extract_contract_r209(root, ns),
        Variant::R207R208 => extract_contract_r207(root, ns),
    }
}

fn extract_contract_r207(root: Node, ns: Option<&str>) -> Option<Contract> {
    let title = element_text(find(root, "TITLE_CONTRACT", ns)).unwrap_or_default();
    let short_description = element_text(find(root, "SHORT_CONTRACT_DESCRIPTION", ns));

    let cpv_main = find(root, "CPV_MAIN", ns).and_then(|e| find(e, "CPV_CODE", ns));
    let cpv_additional: Vec<Node> = find(root, "CPV_ADDITIONAL", ns)
        .map(|e| find_all(e, "CPV_CODE", ns))
        .unwrap_or_default();

    let nature_elem = find(root, "NC_CONTRACT_NATURE", ns);
    let procedure_elem = find(root, "PR_PROC", ns);

    let nuts_code = find(root, "LOCATION_NUTS", ns)
        .and_then(|e| find(e, "NUTS", ns))
        .and_then(|n| attr(Some(n), "CODE"))
        .map(str::to_string);

    let desc_map = cpv_description_map(root, ns);
    let mut cpv_codes = Vec::new();
    let main_code = cpv_main.and_then(|e| attr(Some(e), "CODE")).map(str::to_string);
    if let Some(code) = &main_code {
        cpv_codes.push(CodelistEntry::new(code.clone(), lookup_cpv_description(&desc_map, code)));
    }
    for elem in cpv_additional {
        if let Some(code) = attr(Some(elem), "CODE") {
            cpv_codes.push(CodelistEntry::new(code, lookup_cpv_description(&desc_map, code)));
        }
    }

    let procedure_code = attr(procedure_elem, "CODE");
    let procedure_description = text(procedure_elem);
    let (procedure_type, accelerated) = normalize_procedure_type(procedure_code, procedure_description.as_deref());

    let eu_funded = find(root, "RELATES_TO_EU_PROJECT_YES", ns).is_some();

    Some(Contract {
        title,
        short_description,
        main_cpv_code: main_code.map(|c| CodelistEntry::new(c.clone(), lookup_cpv_description(&desc_map, &c))),
        cpv_codes,
        nuts_code,
        contract_nature_code: normalize_contract_nature(attr(nature_elem, "CODE")),
        procedure_type,
        accelerated,
        eu_funded,
        ..Default::default()
    })
}

fn extract_contract_r209(root: Node, ns: Option<&str>) -> Option<Contract> {
    let f03 = find(root, "F03_2014", ns)?;
    let object_elem = find(f03, "OBJECT_CONTRACT", ns)?;

    let title = element_text(find(object_elem, "TITLE", ns)).unwrap_or_default();
    let short_description = element_text(find(object_elem, "SHORT_DESCR", ns));
    let cpv_main = find(object_elem, "CPV_MAIN", ns).and_then(|e| find(e, "CPV_CODE", ns));
    let type_contract = find(object_elem, "TYPE_CONTRACT", ns);
    let procedure_elem = find(root, "PR_PROC", ns);

    let nuts_code = find(object_elem, "OBJECT_DESCR", ns)
        .and_then(|e| find(e, "NUTS", None))
        .and_then(|n| attr(Some(n), "CODE"))
        .map(str::to_string);

    let desc_map = cpv_description_map(root, ns);
    let mut cpv_codes = Vec::new();
    let main_code = cpv_main.and_then(|e| attr(Some(e), "CODE")).map(str::to_string);
    if let Some(code) = &main_code {
        cpv_codes.push(CodelistEntry::new(code.clone(), lookup_cpv_description(&desc_map, code)));
    }

    let procedure_code = attr(procedure_elem, "CODE");
    let procedure_description = text(procedure_elem);
    let (procedure_type, accelerated) = normalize_procedure_type(procedure_code, procedure_description.as_deref());

    let object_descr = find(object_elem, "OBJECT_DESCR", ns);
    let framework_agreement = object_descr.and_then(|e| find(e, "FRAMEWORK", ns)).is_some();
    let eu_funded = object_descr.and_then(|e| find(e, "EU_PROGR_RELATED", ns)).is_some();

    let est_val = find(object_elem, "VAL_ESTIMATED_TOTAL", ns);
    let estimated_value = est_val.and_then(|e| text(Some(e))).and_then(|s| monetary_value(&s, "estimated_value"));
    let estimated_value_currency = attr(est_val, "CURRENCY").map(str::to_string);

    Some(Contract {
        title,
        short_description,
        main_cpv_code: main_code.map(|c| CodelistEntry::new(c.clone(), lookup_cpv_description(&desc_map, &c))),
        cpv_codes,
        nuts_code,
        contract_nature_code: normalize_contract_nature(attr(type_contract, "CTYPE")),
        procedure_type,
        accelerated,
        framework_agreement,
        eu_funded,
        estimated_value,
        estimated_value_currency,
    })
}

fn extract_awards(root: Node, ns: Option<&str>, variant: Variant) -> Vec<Award> {
    match variant {
        Variant::R209 => extract_awards_r209(root, ns),
        Variant::R207R208 => extract_awards_r207(root, ns),
    }
}

fn extract_awards_r207(root: Node, ns: Option<&str>) -> Vec<Award> {
    let mut awards = Vec::new();

    for award_elem in find_all(root, "AWARD_OF_CONTRACT", ns) {
        // Non-awarded lots appear as near-empty placeholder elements.
        if find(award_elem, "ECONOMIC_OPERATOR_NAME_ADDRESS", ns).is_none()
            && find(award_elem, "CONTRACT_VALUE_INFORMATION", ns).is_none()
            && find(award_elem, "CONTRACT_NUMBER", ns).is_none()
            && find(award_elem, "CONTRACT_AWARD_DATE", ns).is_none()
        {
            continue;
        }

        let value_container = find(award_elem, "COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE", ns);
        let value_elem = value_container.and_then(|e| find(e, "VALUE_COST", ns));

        let award_date = find(award_elem, "CONTRACT_AWARD_DATE", ns).and_then(|d| {
            let day = text(find(d, "DAY", ns))?;
            let month = text(find(d, "MONTH", ns))?;
            let year = text(find(d, "YEAR", ns))?;
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        });

        awards.push(Award {
            contract_number: text(find(award_elem, "CONTRACT_NUMBER", ns)),
            award_title: element_text(find(award_elem, "CONTRACT_TITLE", ns)),
            awarded_value: value_elem.and_then(|e| text(Some(e))).and_then(|s| monetary_value(&s, "awarded_value")),
            awarded_value_currency: attr(value_container, "CURRENCY").map(str::to_string),
            tenders_received: parse_optional_int(
                &text(find(award_elem, "OFFERS_RECEIVED_NUMBER", ns)).unwrap_or_default(),
                "tenders_received",
            ),
            lot_number: attr(Some(award_elem), "ITEM").map(str::to_string),
            award_date,
            contractors: extract_contractors_r207(award_elem, ns),
            ..Default::default()
        });
    }

    awards
}

fn extract_contractors_r207(award_elem: Node, ns: Option<&str>) -> Vec<Organization> {
    find_all(award_elem, "ECONOMIC_OPERATOR_NAME_ADDRESS", ns)
        .into_iter()
        .filter_map(|contractor_elem| {
            let contact_data = find(contractor_elem, "CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME", ns)?;
            let org_elem = find(contact_data, "ORGANISATION", ns);
            let official_name = org_elem
                .and_then(|o| text(find_child(o, "OFFICIALNAME", ns)).or_else(|| text(Some(o))))
                .unwrap_or_default();

            let identifiers = org_elem
                .and_then(|o| text(find(o, "NATIONALID", ns)))
                .map(|id| vec![Identifier { scheme: None, value: id }])
                .unwrap_or_default();

            Some(Organization {
                official_name,
                address: text(find(contact_data, "ADDRESS", ns)),
                town: text(find(contact_data, "TOWN", ns)),
                postal_code: text(find(contact_data, "POSTAL_CODE", ns)),
                country_code: attr(find(contact_data, "COUNTRY", ns), "VALUE").map(str::to_string),
                nuts_code: None,
                identifiers,
            })
        })
        .collect()
}

fn extract_awards_r209(root: Node, ns: Option<&str>) -> Vec<Award> {
    let mut awards = Vec::new();
    let Some(f03) = find(root, "F03_2014", ns) else {
        return awards;
    };

    for award_elem in find_all(f03, "AWARD_CONTRACT", ns) {
        let Some(decision) = find(award_elem, "AWARDED_CONTRACT", ns) else {
            continue;
        };

        let value_elem = find(decision, "VAL_TOTAL", ns);
        let award_date = text(find(decision, "DATE_CONCLUSION_CONTRACT", ns))
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());

        awards.push(Award {
            contract_number: text(find(award_elem, "CONTRACT_NO", ns)),
            award_title: element_text(find(award_elem, "TITLE", ns)),
            awarded_value: value_elem.and_then(|e| text(Some(e))).and_then(|s| monetary_value(&s, "awarded_value")),
            awarded_value_currency: attr(value_elem, "CURRENCY").map(str::to_string),
            tenders_received: parse_optional_int(
                &text(find(decision, "NB_TENDERS_RECEIVED", ns)).unwrap_or_default(),
                "tenders_received",
            ),
            lot_number: attr(Some(award_elem), "ITEM").map(str::to_string),
            award_date,
            contractors: extract_contractors_r209(decision, ns),
            ..Default::default()
        });
    }

    awards
}

fn extract_contractors_r209(decision: Node, ns: Option<&str>) -> Vec<Organization> {
    find_all(decision, "CONTRACTOR", ns)
        .into_iter()
        .map(|contractor_elem| {
            let nuts_elem = find(contractor_elem, "NUTS", None);
            let identifiers = text(find(contractor_elem, "NATIONALID", ns))
                .map(|id| vec![Identifier { scheme: None, value: id }])
                .unwrap_or_default();

            Organization {
                official_name: text(find(contractor_elem, "OFFICIALNAME", ns)).unwrap_or_default(),
                address: text(find(contractor_elem, "ADDRESS", ns)),
                town: text(find(contractor_elem, "TOWN", ns)),
                postal_code: text(find(contractor_elem, "POSTAL_CODE", ns)),
                country_code: attr(find(contractor_elem, "COUNTRY", ns), "VALUE").map(str::to_string),
                nuts_code: attr(nuts_elem, "CODE").map(str::to_string),
                identifiers,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    const R207_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TED_EXPORT xmlns="http://publications.europa.eu/TED_schema/Export" DOC_ID="123456-2020" EDITION="20200101">
  <CODED_DATA_SECTION>
    <REF_OJS><DATE_PUB>20200101</DATE_PUB></REF_OJS>
    <ISO_COUNTRY VALUE="DE"/>
  </CODED_DATA_SECTION>
  <FORM_SECTION>
    <F03_2014_R207>
      <CA_CE_CONCESSIONAIRE_PROFILE>
        <ORGANISATION><OFFICIALNAME>Stadt Beispiel</OFFICIALNAME></ORGANISATION>
        <ADDRESS>Hauptstr. 1</ADDRESS>
        <TOWN>Beispielstadt</TOWN>
        <POSTAL_CODE>12345</POSTAL_CODE>
        <COUNTRY VALUE="DE"/>
        <PHONE>+49 30 1234</PHONE>
      </CA_CE_CONCESSIONAIRE_PROFILE>
      <AA_AUTHORITY_TYPE CODE="3"/>
      <TITLE_CONTRACT><P>Road works</P></TITLE_CONTRACT>
      <CPV_MAIN><CPV_CODE CODE="45000000"/></CPV_MAIN>
      <NC_CONTRACT_NATURE CODE="1"/>
      <PR_PROC CODE="1">Open procedure</PR_PROC>
      <AWARD_OF_CONTRACT ITEM="1">
        <CONTRACT_NUMBER>1</CONTRACT_NUMBER>
        <CONTRACT_TITLE><P>Lot 1</P></CONTRACT_TITLE>
        <CONTRACT_VALUE_INFORMATION>
          <COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE CURRENCY="EUR">
            <VALUE_COST>100000</VALUE_COST>
          </COSTS_RANGE_AND_CURRENCY_WITH_VAT_RATE>
        </CONTRACT_VALUE_INFORMATION>
        <ECONOMIC_OPERATOR_NAME_ADDRESS>
          <CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME>
            <ORGANISATION><OFFICIALNAME>Baufirma GmbH</OFFICIALNAME></ORGANISATION>
            <COUNTRY VALUE="DE"/>
          </CONTACT_DATA_WITHOUT_RESPONSIBLE_NAME>
        </ECONOMIC_OPERATOR_NAME_ADDRESS>
      </AWARD_OF_CONTRACT>
    </F03_2014_R207>
  </FORM_SECTION>
</TED_EXPORT>"#;

    #[test]
    fn parses_r207_sample_notice() {
        let doc = Document::parse(R207_SAMPLE).unwrap();
        let notice = parse(doc.root_element(), "123456_2020").unwrap().unwrap();
        assert_eq!(notice.document.doc_id, "123456-2020");
        assert_eq!(notice.buyer.official_name, "Stadt Beispiel");
        assert_eq!(notice.contract.title, "Road works");
        assert_eq!(notice.awards.len(), 1);
        assert_eq!(notice.awards[0].contractors[0].official_name, "Baufirma GmbH");
        assert_eq!(notice.awards[0].awarded_value, Some(100000.0));
    }

    #[test]
    fn missing_publication_date_yields_none() {
        let xml = r#"<TED_EXPORT xmlns="http://publications.europa.eu/TED_schema/Export" DOC_ID="1-2020" EDITION="20200101"></TED_EXPORT>"#;
        let doc = Document::parse(xml).unwrap();
        assert!(parse(doc.root_element(), "1_2020").unwrap().is_none());
    }
}
